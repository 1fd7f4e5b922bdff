use sitegate_core::{AppResult, IdentitySelector};
use sitegate_domain::{UserRole, remove_role, union_role};

use super::{ClaimsChangeSet, ClaimsOperation, ClaimsSyncService, PlannedState, SyncMode, sanitize_roles};

impl ClaimsSyncService {
    /// Adds the `any/super_admin` sentinel and raises both admin booleans.
    ///
    /// The profile record is written only when the sentinel was missing.
    pub async fn grant_super_admin(
        &self,
        selector: &IdentitySelector,
        mode: SyncMode,
    ) -> AppResult<ClaimsChangeSet> {
        let snapshot = self.load_snapshot(selector).await?;

        let mut profile_roles = snapshot.profile_roles.clone();
        union_role(&mut profile_roles, UserRole::super_admin_sentinel());

        let mut claims = snapshot
            .claims
            .clone()
            .with_roles(sanitize_roles(snapshot.identity.uid(), &profile_roles));
        claims.admin = true;
        claims.super_admin = true;

        self.finish(
            ClaimsOperation::GrantSuperAdmin,
            snapshot,
            PlannedState {
                claims,
                profile_roles,
            },
            mode,
        )
        .await
    }

    /// Removes exactly the `any/super_admin` sentinel and clears `super_admin`.
    ///
    /// Every other role and the `admin` boolean are left as they are.
    pub async fn revoke_super_admin(
        &self,
        selector: &IdentitySelector,
        mode: SyncMode,
    ) -> AppResult<ClaimsChangeSet> {
        let snapshot = self.load_snapshot(selector).await?;

        let mut profile_roles = snapshot.profile_roles.clone();
        remove_role(&mut profile_roles, &UserRole::super_admin_sentinel());

        let mut claims = snapshot
            .claims
            .clone()
            .with_roles(sanitize_roles(snapshot.identity.uid(), &profile_roles));
        claims.super_admin = false;

        self.finish(
            ClaimsOperation::RevokeSuperAdmin,
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
