use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use sitegate_domain::{AuthenticatedUser, OrgHierarchy, RoleName};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::PermissionService;

#[cfg(test)]
mod tests;

/// Session facts the front door reacts to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Whether the session opted into matrix-based permissions.
    pub uses_permissions: bool,
    /// Signed-in user, if any.
    pub user: Option<AuthenticatedUser>,
}

impl SessionState {
    /// Creates a signed-in session.
    #[must_use]
    pub fn signed_in(user: AuthenticatedUser, uses_permissions: bool) -> Self {
        Self {
            uses_permissions,
            user: Some(user),
        }
    }

    fn watch_key(&self) -> (bool, bool, Option<&str>) {
        (
            self.uses_permissions,
            self.user.is_some(),
            self.user.as_ref().map(AuthenticatedUser::uid),
        )
    }

    fn wants_permissions(&self) -> bool {
        self.uses_permissions && self.user.is_some()
    }
}

enum Rearm {
    Unchanged,
    Idle,
    Load(u64),
}

/// Binds a [`PermissionService`] to the live session.
///
/// Whenever `(uses_permissions, authenticated, uid)` changes, the front door
/// either starts a load or resets the service. Loads that settle after a later
/// change are ignored.
pub struct AuthorizationFrontDoor {
    permission_service: Arc<PermissionService>,
    session: RwLock<SessionState>,
    epoch: AtomicU64,
    permissions_loaded: AtomicBool,
}

impl AuthorizationFrontDoor {
    /// Creates a front door and arms it for `initial` right away.
    pub async fn new(permission_service: Arc<PermissionService>, initial: SessionState) -> Arc<Self> {
        let front_door = Arc::new(Self {
            permission_service,
            session: RwLock::new(initial),
            epoch: AtomicU64::new(0),
            permissions_loaded: AtomicBool::new(false),
        });

        let rearm = {
            let session = front_door.read_session();
            front_door.arm(&session)
        };
        front_door.settle(rearm).await;
        front_door
    }

    /// Creates a front door that follows a session channel.
    ///
    /// The current value is applied before returning; later values are applied
    /// by a background task that ends when the sender is dropped.
    pub async fn bind(
        permission_service: Arc<PermissionService>,
        mut session: watch::Receiver<SessionState>,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let initial = session.borrow_and_update().clone();
        let front_door = Self::new(permission_service, initial).await;

        let watcher = {
            let front_door = Arc::clone(&front_door);
            tokio::spawn(async move {
                while session.changed().await.is_ok() {
                    let next = session.borrow_and_update().clone();
                    let rearm = front_door.apply(next);
                    let front_door = Arc::clone(&front_door);
                    tokio::spawn(async move {
                        front_door.settle(rearm).await;
                    });
                }
                debug!("session channel closed");
            })
        };

        (front_door, watcher)
    }

    /// Applies a new session state and waits for any load it starts.
    ///
    /// An unchanged session that still lacks permissions retries the load.
    ///
    /// Returns whether permissions are loaded for the resulting session.
    pub async fn observe(&self, next: SessionState) -> bool {
        let rearm = self.apply(next);
        self.settle(rearm).await
    }

    /// Retries the permission load for the current session if it has not
    /// succeeded yet.
    ///
    /// Returns whether permissions are loaded afterwards. Sessions that do not
    /// use permissions stay unloaded.
    pub async fn ensure_permissions_loaded(&self) -> bool {
        let rearm = {
            let session = self.read_session();
            self.retry(&session)
        };
        self.settle(rearm).await
    }

    /// Returns whether permissions are loaded for the current session.
    #[must_use]
    pub fn permissions_loaded(&self) -> bool {
        self.permissions_loaded.load(Ordering::SeqCst)
    }

    /// Site-scoped capability check for the current user.
    ///
    /// A missing `site_id` denies.
    #[must_use]
    pub fn can(
        &self,
        site_id: Option<&str>,
        resource: &str,
        action: &str,
        sub_resource: Option<&str>,
    ) -> bool {
        let Some(site_id) = site_id else {
            return false;
        };
        if !self.permissions_loaded() {
            return false;
        }

        let session = self.read_session();
        self.permission_service.can_perform_site_action(
            session.user.as_ref(),
            site_id,
            resource,
            action,
            sub_resource,
        )
    }

    /// Capability check for an org node, scoped to its top-level site.
    ///
    /// Nodes without an owning site deny.
    #[must_use]
    pub fn can_in_org(
        &self,
        hierarchy: &OrgHierarchy,
        org_id: &str,
        resource: &str,
        action: &str,
        sub_resource: Option<&str>,
    ) -> bool {
        self.can(
            hierarchy.top_level_site(org_id),
            resource,
            action,
            sub_resource,
        )
    }

    /// Site-independent capability check for the current user.
    #[must_use]
    pub fn can_global(&self, resource: &str, action: &str, sub_resource: Option<&str>) -> bool {
        if !self.permissions_loaded() {
            return false;
        }

        let session = self.read_session();
        self.permission_service.can_perform_global_action(
            session.user.as_ref(),
            resource,
            action,
            sub_resource,
        )
    }

    /// Minimum-role check for the current user.
    #[must_use]
    pub fn has_role(&self, site_id: Option<&str>, required: &RoleName) -> bool {
        if !self.permissions_loaded() {
            return false;
        }

        let session = self.read_session();
        self.permission_service
            .has_role(session.user.as_ref(), site_id, required)
    }

    fn apply(&self, next: SessionState) -> Rearm {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let changed = session.watch_key() != next.watch_key();
        *session = next;

        if changed {
            self.arm(&session)
        } else {
            self.retry(&session)
        }
    }

    // A failed load leaves the epoch in place, so a retry settles under it.
    fn retry(&self, session: &SessionState) -> Rearm {
        if session.wants_permissions() && !self.permissions_loaded() {
            Rearm::Load(self.epoch.load(Ordering::SeqCst))
        } else {
            Rearm::Unchanged
        }
    }

    // Callers hold the session lock so arming and settling never interleave.
    fn arm(&self, session: &SessionState) -> Rearm {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        self.permissions_loaded.store(false, Ordering::SeqCst);

        if session.wants_permissions() {
            Rearm::Load(epoch)
        } else {
            self.permission_service.reset();
            debug!(epoch, "permissions disarmed");
            Rearm::Idle
        }
    }

    async fn settle(&self, rearm: Rearm) -> bool {
        let epoch = match rearm {
            Rearm::Unchanged => return self.permissions_loaded(),
            Rearm::Idle => return false,
            Rearm::Load(epoch) => epoch,
        };

        let loaded = self.permission_service.ensure_loaded().await;

        let _session = self.read_session();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(epoch, "ignoring permission load for a stale session");
            return false;
        }

        self.permissions_loaded.store(loaded, Ordering::SeqCst);
        debug!(epoch, loaded, "permissions armed");
        loaded
    }

    fn read_session(&self) -> RwLockReadGuard<'_, SessionState> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }
}
