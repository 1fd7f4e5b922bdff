use crate::claims::CustomClaims;
use crate::role::{RoleName, UserRole, highest_role};

/// Authenticated caller as seen by capability checks.
///
/// Built from the fast-path claims only; the profile record is never read at
/// request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    uid: String,
    roles: Vec<UserRole>,
}

impl AuthenticatedUser {
    /// Creates a caller from a uid and role list.
    #[must_use]
    pub fn new(uid: impl Into<String>, roles: Vec<UserRole>) -> Self {
        Self {
            uid: uid.into(),
            roles,
        }
    }

    /// Creates a caller from its session claims.
    #[must_use]
    pub fn from_claims(uid: impl Into<String>, claims: &CustomClaims) -> Self {
        Self::new(uid, claims.roles.clone())
    }

    /// Returns the caller uid.
    #[must_use]
    pub fn uid(&self) -> &str {
        self.uid.as_str()
    }

    /// Returns the caller role entries.
    #[must_use]
    pub fn roles(&self) -> &[UserRole] {
        &self.roles
    }

    /// Returns whether the caller holds the `any/super_admin` sentinel.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.roles.iter().any(UserRole::is_super_admin_sentinel)
    }

    /// Returns the highest role held at `site_id`.
    #[must_use]
    pub fn site_role(&self, site_id: &str) -> Option<&RoleName> {
        highest_role(
            self.roles
                .iter()
                .filter(|entry| entry.site_id == site_id)
                .map(|entry| &entry.role),
        )
    }

    /// Returns the highest role held anywhere.
    #[must_use]
    pub fn highest_role(&self) -> Option<&RoleName> {
        highest_role(self.roles.iter().map(|entry| &entry.role))
    }
}
