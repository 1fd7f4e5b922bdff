use sitegate_core::{AppResult, IdentitySelector};
use sitegate_domain::UserRole;
use tracing::warn;

use super::{ClaimsChangeSet, ClaimsOperation, ClaimsSyncService, PlannedState, SyncMode, sanitize_roles};

impl ClaimsSyncService {
    /// Re-derives claims-side roles from the profile record.
    ///
    /// An empty profile falls back to the current claims roles, then to the
    /// sentinel when `super_admin` is already set. `admin` and `super_admin`
    /// are kept from the current claims. The profile record is never written.
    pub async fn rebuild_custom_claims(
        &self,
        selector: &IdentitySelector,
        mode: SyncMode,
    ) -> AppResult<ClaimsChangeSet> {
        let snapshot = self.load_snapshot(selector).await?;
        let uid = snapshot.identity.uid();

        let mut roles = sanitize_roles(uid, &snapshot.profile_roles);
        if roles.is_empty() {
            roles = sanitize_roles(uid, &snapshot.claims.roles);
            if !roles.is_empty() {
                warn!(uid = %uid, "profile has no roles; keeping current claims roles");
            } else if snapshot.claims.super_admin {
                warn!(uid = %uid, "profile and claims have no roles; restoring super admin sentinel");
                roles.push(UserRole::super_admin_sentinel());
            }
        }

        let claims = snapshot.claims.clone().with_roles(roles);
        let profile_roles = snapshot.profile_roles.clone();

        self.finish(
            ClaimsOperation::RebuildCustomClaims,
            snapshot,
            PlannedState {
                claims,
                profile_roles,
            },
            mode,
        )
        .await
    }
}
