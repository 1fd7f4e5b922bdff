use chrono::{DateTime, Utc};
use serde::Serialize;
use sitegate_core::{AppResult, IdentitySelector};
use sitegate_domain::UserRole;

use super::ClaimsSyncService;

/// Read-only comparison of an account's profile record, claims and mirror.
///
/// Disagreement between the booleans and the roles is expected until the
/// user's token refreshes; the report only surfaces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsDriftReport {
    /// Account uid.
    pub uid: String,
    /// Account email, when known.
    pub email: Option<String>,
    /// Roles held in the profile record.
    pub profile_roles: Vec<UserRole>,
    /// Roles carried in the fast-path claims.
    pub claims_roles: Vec<UserRole>,
    /// Profile roles absent from the claims.
    pub missing_from_claims: Vec<UserRole>,
    /// Claims roles absent from the profile.
    pub missing_from_profile: Vec<UserRole>,
    /// Why the derived claim fields disagree with `roles`, if they do.
    pub derived_fields_problem: Option<String>,
    /// Current `admin` claim.
    pub admin: bool,
    /// Current `super_admin` claim.
    pub super_admin: bool,
    /// Whether `super_admin` agrees with the presence of the sentinel role.
    pub super_admin_matches_roles: bool,
    /// Whether the mirror holds exactly the current claims.
    pub mirror_matches_claims: bool,
    /// Time of the last mirror write.
    pub mirror_last_updated: Option<DateTime<Utc>>,
}

impl ClaimsDriftReport {
    /// Returns whether any of the compared sources disagree.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.missing_from_claims.is_empty()
            || !self.missing_from_profile.is_empty()
            || self.derived_fields_problem.is_some()
            || !self.super_admin_matches_roles
            || !self.mirror_matches_claims
    }
}

impl ClaimsSyncService {
    /// Reports drift between the profile record, claims and claims mirror.
    pub async fn inspect(&self, selector: &IdentitySelector) -> AppResult<ClaimsDriftReport> {
        let snapshot = self.load_snapshot(selector).await?;
        let claims = &snapshot.claims;

        let missing_from_claims = difference(&snapshot.profile_roles, &claims.roles);
        let missing_from_profile = difference(&claims.roles, &snapshot.profile_roles);

        Ok(ClaimsDriftReport {
            uid: snapshot.identity.uid().to_owned(),
            email: snapshot.identity.email().map(str::to_owned),
            profile_roles: snapshot.profile_roles.clone(),
            claims_roles: claims.roles.clone(),
            missing_from_claims,
            missing_from_profile,
            derived_fields_problem: claims
                .verify_derived_fields()
                .err()
                .map(|error| error.to_string()),
            admin: claims.admin,
            super_admin: claims.super_admin,
            super_admin_matches_roles: claims.super_admin == claims.has_super_admin_role(),
            mirror_matches_claims: snapshot
                .mirror
                .as_ref()
                .is_some_and(|entry| &entry.claims == claims),
            mirror_last_updated: snapshot.mirror.as_ref().map(|entry| entry.last_updated),
        })
    }
}

fn difference(left: &[UserRole], right: &[UserRole]) -> Vec<UserRole> {
    left.iter()
        .filter(|entry| !right.iter().any(|other| other.same_assignment(entry)))
        .cloned()
        .collect()
}
