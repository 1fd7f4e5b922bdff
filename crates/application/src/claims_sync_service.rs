use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sitegate_core::{AppError, AppResult, IdentitySelector, UserIdentity};
use sitegate_domain::{CustomClaims, UserRole, dedupe_roles};
use tracing::{info, warn};

use crate::{
    ClaimsMirrorEntry, ClaimsMirrorRepository, IdentityProvider, ProfileRepository, SiteDirectory,
};

mod inspect;
mod rebuild;
mod site_admins;
mod super_admin;


pub use inspect::ClaimsDriftReport;
pub use site_admins::SiteAdminAssignment;

/// Whether an operation only plans its writes or performs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Compute and report the change set without writing.
    DryRun,
    /// Compute the change set and write every store that differs.
    Apply,
}

/// Synchronizer operation that produced a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsOperation {
    /// Adds the global super-admin sentinel.
    GrantSuperAdmin,
    /// Removes the global super-admin sentinel.
    RevokeSuperAdmin,
    /// Re-derives claims from the profile record.
    RebuildCustomClaims,
    /// Adds `site_admin` roles at named sites.
    AssignSiteAdmins,
}

impl ClaimsOperation {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GrantSuperAdmin => "grant_super_admin",
            Self::RevokeSuperAdmin => "revoke_super_admin",
            Self::RebuildCustomClaims => "rebuild_custom_claims",
            Self::AssignSiteAdmins => "assign_site_admins",
        }
    }
}

/// Proposed or applied changes for one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsChangeSet {
    /// Operation that computed the change set.
    pub operation: ClaimsOperation,
    /// Account uid.
    pub uid: String,
    /// Account email, when known.
    pub email: Option<String>,
    /// Claims before the operation.
    pub claims_before: CustomClaims,
    /// Claims after the operation.
    pub claims_after: CustomClaims,
    /// Profile roles before the operation.
    pub profile_roles_before: Vec<UserRole>,
    /// Profile roles after the operation.
    pub profile_roles_after: Vec<UserRole>,
    /// Whether the fast-path claims differ.
    pub writes_claims: bool,
    /// Whether the claims mirror differs.
    pub writes_claims_mirror: bool,
    /// Whether the profile record differs.
    pub writes_profile: bool,
    /// Whether the writes were performed.
    pub applied: bool,
}

impl ClaimsChangeSet {
    /// Returns whether no store needs a write.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.writes_claims && !self.writes_claims_mirror && !self.writes_profile
    }
}

/// Everything an operation reads before deciding what to write.
#[derive(Debug, Clone)]
struct AccountSnapshot {
    identity: UserIdentity,
    claims: CustomClaims,
    profile_roles: Vec<UserRole>,
    mirror: Option<ClaimsMirrorEntry>,
}

/// Next state computed by one operation.
struct PlannedState {
    claims: CustomClaims,
    profile_roles: Vec<UserRole>,
}

/// Reconciles profile-record roles with fast-path claims and their mirror.
///
/// Profile roles are authoritative for `roles`; the `admin` and `super_admin`
/// booleans stay claims-side authoritative. Every operation reads all stores
/// first, verifies the derived claim fields, and then writes only the stores
/// that differ, in the order claims, mirror, profile.
#[derive(Clone)]
pub struct ClaimsSyncService {
    identity_provider: Arc<dyn IdentityProvider>,
    profile_repository: Arc<dyn ProfileRepository>,
    claims_mirror_repository: Arc<dyn ClaimsMirrorRepository>,
    site_directory: Arc<dyn SiteDirectory>,
}

impl ClaimsSyncService {
    /// Creates a synchronizer over the given stores.
    #[must_use]
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        profile_repository: Arc<dyn ProfileRepository>,
        claims_mirror_repository: Arc<dyn ClaimsMirrorRepository>,
        site_directory: Arc<dyn SiteDirectory>,
    ) -> Self {
        Self {
            identity_provider,
            profile_repository,
            claims_mirror_repository,
            site_directory,
        }
    }

    async fn load_snapshot(&self, selector: &IdentitySelector) -> AppResult<AccountSnapshot> {
        let identity = self.identity_provider.resolve_identity(selector).await?;
        let uid = identity.uid().to_owned();

        let claims = self.identity_provider.custom_claims(&uid).await?;
        let profile_roles = self
            .profile_repository
            .find_profile_roles(&uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile record for uid '{uid}'")))?;
        let mirror = self.claims_mirror_repository.find_claims_mirror(&uid).await?;

        Ok(AccountSnapshot {
            identity,
            claims,
            profile_roles,
            mirror,
        })
    }

    async fn finish(
        &self,
        operation: ClaimsOperation,
        snapshot: AccountSnapshot,
        planned: PlannedState,
        mode: SyncMode,
    ) -> AppResult<ClaimsChangeSet> {
        let mut change_set = plan_change_set(operation, snapshot, planned)?;
        self.commit(&mut change_set, mode).await?;
        Ok(change_set)
    }

    async fn commit(&self, change_set: &mut ClaimsChangeSet, mode: SyncMode) -> AppResult<()> {
        if mode == SyncMode::Apply {
            self.write_change_set(change_set).await?;
            change_set.applied = true;
        }

        info!(
            operation = change_set.operation.as_str(),
            uid = %change_set.uid,
            dry_run = mode == SyncMode::DryRun,
            writes_claims = change_set.writes_claims,
            writes_claims_mirror = change_set.writes_claims_mirror,
            writes_profile = change_set.writes_profile,
            "claims sync settled"
        );
        Ok(())
    }

    async fn write_change_set(&self, change_set: &ClaimsChangeSet) -> AppResult<()> {
        let uid = change_set.uid.as_str();

        if change_set.writes_claims {
            self.identity_provider
                .set_custom_claims(uid, &change_set.claims_after)
                .await?;
        }
        if change_set.writes_claims_mirror {
            self.claims_mirror_repository
                .save_claims_mirror(uid, &change_set.claims_after, Utc::now())
                .await?;
        }
        if change_set.writes_profile {
            self.profile_repository
                .save_profile_roles(uid, &change_set.profile_roles_after)
                .await?;
        }

        Ok(())
    }
}

fn plan_change_set(
    operation: ClaimsOperation,
    snapshot: AccountSnapshot,
    planned: PlannedState,
) -> AppResult<ClaimsChangeSet> {
    let AccountSnapshot {
        identity,
        claims,
        profile_roles,
        mirror,
    } = snapshot;
    let uid = identity.uid().to_owned();

    let mut claims_after = planned.claims;
    claims_after.derive_from_roles();
    claims_after.fill_self_references(&uid);
    claims_after.verify_derived_fields()?;

    let writes_claims = claims_after != claims;
    let writes_claims_mirror =
        writes_claims || mirror.is_none_or(|entry| entry.claims != claims_after);
    // A profile that gets written anyway leaves with each pair at most once.
    let mut profile_roles_after = planned.profile_roles;
    if profile_roles_after != profile_roles {
        profile_roles_after = dedupe_roles(profile_roles_after);
    }
    let writes_profile = profile_roles_after != profile_roles;

    Ok(ClaimsChangeSet {
        operation,
        uid,
        email: identity.email().map(str::to_owned),
        claims_before: claims,
        claims_after,
        profile_roles_before: profile_roles,
        profile_roles_after,
        writes_claims,
        writes_claims_mirror,
        writes_profile,
        applied: false,
    })
}

/// Drops malformed entries and repeated `(site_id, role)` pairs.
fn sanitize_roles(uid: &str, roles: &[UserRole]) -> Vec<UserRole> {
    let well_formed: Vec<UserRole> = roles
        .iter()
        .filter(|entry| {
            let keep = entry.is_well_formed();
            if !keep {
                warn!(uid = %uid, entry = ?entry, "dropping malformed role entry");
            }
            keep
        })
        .cloned()
        .collect();

    dedupe_roles(well_formed)
}
