use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use sitegate_core::{AppError, AppResult};
use sitegate_domain::{
    AuthenticatedUser, OrgHierarchy, OrgKind, OrgNode, PermissionMatrix, RoleName, UserRole,
};
use tokio::sync::{Mutex, Notify, watch};

use super::{AuthorizationFrontDoor, SessionState};
use crate::{
    PermissionDocumentSource, PermissionMatrixLoader, PermissionService, PermissionServiceConfig,
    TtlCache,
};

#[derive(Default)]
struct FakeMatrixCache {
    entries: Mutex<HashMap<String, Arc<PermissionMatrix>>>,
}

#[async_trait]
impl TtlCache<Arc<PermissionMatrix>> for FakeMatrixCache {
    async fn get(&self, key: &str) -> AppResult<Option<Arc<PermissionMatrix>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Arc<PermissionMatrix>, _ttl: Duration) -> AppResult<()> {
        self.entries.lock().await.insert(key.to_owned(), value);
        Ok(())
    }
}

struct FakeDocumentSource {
    fetches: AtomicUsize,
    gate: Option<Arc<Notify>>,
    started: Notify,
}

#[async_trait]
impl PermissionDocumentSource for FakeDocumentSource {
    async fn fetch_permission_document(&self) -> AppResult<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(json!({
            "fields": {
                "version": { "stringValue": "1" },
                "permissions": { "mapValue": { "fields": {
                    "users": { "mapValue": { "fields": {
                        "delete": { "stringValue": "admin" }
                    } } }
                } } }
            }
        }))
    }
}

fn source(gate: Option<Arc<Notify>>) -> Arc<FakeDocumentSource> {
    Arc::new(FakeDocumentSource {
        fetches: AtomicUsize::new(0),
        gate,
        started: Notify::new(),
    })
}

fn service(source: Arc<FakeDocumentSource>) -> Arc<PermissionService> {
    Arc::new(PermissionService::new(
        PermissionMatrixLoader::new(source),
        Arc::new(FakeMatrixCache::default()),
        PermissionServiceConfig::default(),
    ))
}

struct FlakyDocumentSource {
    fetches: AtomicUsize,
    failures: usize,
    inner: Arc<FakeDocumentSource>,
}

#[async_trait]
impl PermissionDocumentSource for FlakyDocumentSource {
    async fn fetch_permission_document(&self) -> AppResult<Value> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(AppError::Internal(
                "failed to fetch permission document: connection reset".to_owned(),
            ));
        }
        self.inner.fetch_permission_document().await
    }
}

fn site_admin(uid: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(
        uid,
        vec![UserRole {
            site_id: "site-1".to_owned(),
            role: RoleName::Admin,
            site_name: "Site One".to_owned(),
        }],
    )
}

#[tokio::test]
async fn construction_arms_an_already_enabled_session() {
    let source = source(None);
    let front_door = AuthorizationFrontDoor::new(
        service(source.clone()),
        SessionState::signed_in(site_admin("uid-1"), true),
    )
    .await;

    assert!(front_door.permissions_loaded());
    assert!(front_door.can(Some("site-1"), "users", "delete", None));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn flag_enabled_after_sign_in_triggers_a_load() {
    let source = source(None);
    let front_door = AuthorizationFrontDoor::new(
        service(source.clone()),
        SessionState::signed_in(site_admin("uid-1"), false),
    )
    .await;
    assert!(!front_door.permissions_loaded());
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);

    assert!(
        front_door
            .observe(SessionState::signed_in(site_admin("uid-1"), true))
            .await
    );
    assert!(front_door.can(Some("site-1"), "users", "delete", None));
}

#[tokio::test]
async fn sign_out_resets_and_denies() {
    let permission_service = service(source(None));
    let front_door = AuthorizationFrontDoor::new(
        permission_service.clone(),
        SessionState::signed_in(site_admin("uid-1"), true),
    )
    .await;
    assert!(front_door.permissions_loaded());

    assert!(!front_door.observe(SessionState::default()).await);
    assert!(!front_door.permissions_loaded());
    assert!(!permission_service.is_loaded());
    assert!(!front_door.can(Some("site-1"), "users", "delete", None));
}

#[tokio::test]
async fn late_load_after_sign_out_is_ignored() {
    let gate = Arc::new(Notify::new());
    let source = source(Some(gate.clone()));
    let permission_service = service(source.clone());
    let front_door =
        AuthorizationFrontDoor::new(permission_service.clone(), SessionState::default()).await;

    let pending = {
        let front_door = front_door.clone();
        tokio::spawn(async move {
            front_door
                .observe(SessionState::signed_in(site_admin("uid-1"), true))
                .await
        })
    };
    source.started.notified().await;

    assert!(!front_door.observe(SessionState::default()).await);
    gate.notify_one();

    assert!(matches!(pending.await, Ok(false)));
    assert!(!front_door.permissions_loaded());
    assert!(!permission_service.is_loaded());
}

#[tokio::test]
async fn missing_site_denies_even_when_loaded() {
    let front_door = AuthorizationFrontDoor::new(
        service(source(None)),
        SessionState::signed_in(site_admin("uid-1"), true),
    )
    .await;

    assert!(!front_door.can(None, "users", "delete", None));
    assert!(front_door.has_role(Some("site-1"), &RoleName::SiteAdmin));
    assert!(front_door.can_global("users", "delete", None));
}

#[tokio::test]
async fn org_checks_resolve_the_owning_site() {
    let front_door = AuthorizationFrontDoor::new(
        service(source(None)),
        SessionState::signed_in(site_admin("uid-1"), true),
    )
    .await;
    let hierarchy = OrgHierarchy::new([
        OrgNode {
            id: "site-1".to_owned(),
            kind: OrgKind::Site,
            name: "Site One".to_owned(),
            parent_id: None,
        },
        OrgNode {
            id: "school-1".to_owned(),
            kind: OrgKind::School,
            name: "School One".to_owned(),
            parent_id: Some("site-1".to_owned()),
        },
        OrgNode {
            id: "family-1".to_owned(),
            kind: OrgKind::Family,
            name: "Family".to_owned(),
            parent_id: None,
        },
    ]);

    assert!(front_door.can_in_org(&hierarchy, "school-1", "users", "delete", None));
    assert!(!front_door.can_in_org(&hierarchy, "family-1", "users", "delete", None));
}

#[tokio::test]
async fn bound_channel_follows_session_changes() {
    let permission_service = service(source(None));
    let (sender, receiver) = watch::channel(SessionState::default());
    let (front_door, watcher) = AuthorizationFrontDoor::bind(permission_service, receiver).await;
    assert!(!front_door.permissions_loaded());

    assert!(
        sender
            .send(SessionState::signed_in(site_admin("uid-1"), true))
            .is_ok()
    );
    for _ in 0..50 {
        if front_door.permissions_loaded() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(front_door.permissions_loaded());

    drop(sender);
    assert!(watcher.await.is_ok());
}

#[tokio::test]
async fn failed_load_is_retried_for_the_same_session() {
    let flaky = Arc::new(FlakyDocumentSource {
        fetches: AtomicUsize::new(0),
        failures: 1,
        inner: source(None),
    });
    let permission_service = Arc::new(PermissionService::new(
        PermissionMatrixLoader::new(flaky.clone()),
        Arc::new(FakeMatrixCache::default()),
        PermissionServiceConfig::default(),
    ));
    let session = SessionState::signed_in(site_admin("uid-1"), true);

    let front_door = AuthorizationFrontDoor::new(permission_service, session.clone()).await;
    assert!(!front_door.permissions_loaded());
    assert!(!front_door.has_role(Some("site-1"), &RoleName::SiteAdmin));
    assert_eq!(flaky.fetches.load(Ordering::SeqCst), 1);

    assert!(front_door.observe(session).await);
    assert_eq!(flaky.fetches.load(Ordering::SeqCst), 2);
    assert!(front_door.has_role(Some("site-1"), &RoleName::SiteAdmin));
    assert!(front_door.can(Some("site-1"), "users", "delete", None));

    assert!(front_door.ensure_permissions_loaded().await);
    assert_eq!(flaky.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn explicit_retry_picks_up_a_matrix_loaded_elsewhere() {
    let flaky = Arc::new(FlakyDocumentSource {
        fetches: AtomicUsize::new(0),
        failures: 1,
        inner: source(None),
    });
    let permission_service = Arc::new(PermissionService::new(
        PermissionMatrixLoader::new(flaky.clone()),
        Arc::new(FakeMatrixCache::default()),
        PermissionServiceConfig::default(),
    ));
    let front_door = AuthorizationFrontDoor::new(
        Arc::clone(&permission_service),
        SessionState::signed_in(site_admin("uid-1"), true),
    )
    .await;
    assert!(!front_door.permissions_loaded());

    assert!(permission_service.ensure_loaded().await);
    assert!(front_door.ensure_permissions_loaded().await);
    assert!(front_door.has_role(Some("site-1"), &RoleName::SiteAdmin));
    assert_eq!(flaky.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn explicit_retry_stays_idle_without_the_flag() {
    let source = source(None);
    let front_door = AuthorizationFrontDoor::new(
        service(source.clone()),
        SessionState::signed_in(site_admin("uid-1"), false),
    )
    .await;

    assert!(!front_door.ensure_permissions_loaded().await);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}
