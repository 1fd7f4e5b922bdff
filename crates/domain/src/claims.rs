use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitegate_core::{AppError, AppResult};

use crate::role::{RoleName, UserRole};

/// Denormalized authorization state attached to a user's session token.
///
/// `roles_set`, `site_roles` and `site_names` are caches of `roles`; call
/// [`CustomClaims::derive_from_roles`] after touching `roles`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomClaims {
    /// Legacy admin gate. Claims-side authoritative.
    #[serde(default)]
    pub admin: bool,
    /// Legacy super-admin gate. Claims-side authoritative.
    #[serde(default, rename = "super_admin")]
    pub super_admin: bool,
    /// Routes the session through the permission matrix.
    #[serde(default)]
    pub use_new_permissions: bool,
    /// Canonical role list copied from the profile record.
    #[serde(default)]
    pub roles: Vec<UserRole>,
    /// Distinct role names from `roles`.
    #[serde(default)]
    pub roles_set: Vec<RoleName>,
    /// Distinct role names per site from `roles`.
    #[serde(default)]
    pub site_roles: BTreeMap<String, Vec<RoleName>>,
    /// Site display names from `roles`.
    #[serde(default)]
    pub site_names: BTreeMap<String, String>,
    /// Self-reference to the account uid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roar_uid: Option<String>,
    /// Self-reference to the account uid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_uid: Option<String>,
    /// Self-reference to the account uid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_uid: Option<String>,
    /// Claims owned by other systems, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Maps derivable from a role list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedRoleMaps {
    /// Distinct role names in first-appearance order.
    pub roles_set: Vec<RoleName>,
    /// Distinct role names per site in first-appearance order.
    pub site_roles: BTreeMap<String, Vec<RoleName>>,
    /// First non-empty display name per site, falling back to the site id.
    pub site_names: BTreeMap<String, String>,
}

impl DerivedRoleMaps {
    /// Derives the caches from `roles`.
    #[must_use]
    pub fn from_roles(roles: &[UserRole]) -> Self {
        let mut derived = Self::default();

        for entry in roles {
            if !derived.roles_set.contains(&entry.role) {
                derived.roles_set.push(entry.role.clone());
            }

            let site_roles = derived.site_roles.entry(entry.site_id.clone()).or_default();
            if !site_roles.contains(&entry.role) {
                site_roles.push(entry.role.clone());
            }

            let site_name = derived
                .site_names
                .entry(entry.site_id.clone())
                .or_insert_with(String::new);
            if site_name.is_empty() {
                site_name.clone_from(&entry.site_name);
            }
        }

        for (site_id, site_name) in &mut derived.site_names {
            if site_name.trim().is_empty() {
                site_name.clone_from(site_id);
            }
        }

        derived
    }
}

impl CustomClaims {
    /// Replaces `roles` and recomputes the derived caches.
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<UserRole>) -> Self {
        self.roles = roles;
        self.derive_from_roles();
        self
    }

    /// Recomputes `roles_set`, `site_roles` and `site_names` from `roles`.
    pub fn derive_from_roles(&mut self) {
        let derived = DerivedRoleMaps::from_roles(&self.roles);
        self.roles_set = derived.roles_set;
        self.site_roles = derived.site_roles;
        self.site_names = derived.site_names;
    }

    /// Checks that the derived caches match what `roles` implies.
    pub fn verify_derived_fields(&self) -> AppResult<()> {
        let mut problems = Vec::new();

        if let Some(malformed) = self.roles.iter().find(|entry| !entry.is_well_formed()) {
            problems.push(format!(
                "role entry has an empty site id or role: {malformed:?}"
            ));
        }

        let expected = DerivedRoleMaps::from_roles(&self.roles);
        if self.roles_set != expected.roles_set {
            problems.push(format!(
                "rolesSet {:?} does not match roles (expected {:?})",
                self.roles_set, expected.roles_set
            ));
        }
        if self.site_roles != expected.site_roles {
            problems.push(format!(
                "siteRoles {:?} does not match roles (expected {:?})",
                self.site_roles, expected.site_roles
            ));
        }
        if self.site_names != expected.site_names {
            problems.push(format!(
                "siteNames {:?} does not match roles (expected {:?})",
                self.site_names, expected.site_names
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(problems.join("; ")))
        }
    }

    /// Returns whether `roles` carries the global super-admin sentinel.
    #[must_use]
    pub fn has_super_admin_role(&self) -> bool {
        self.roles.iter().any(UserRole::is_super_admin_sentinel)
    }

    /// Fills missing uid self-references with `uid`.
    pub fn fill_self_references(&mut self, uid: &str) {
        for slot in [
            &mut self.roar_uid,
            &mut self.admin_uid,
            &mut self.assessment_uid,
        ] {
            if slot.as_deref().is_none_or(|value| value.trim().is_empty()) {
                *slot = Some(uid.to_owned());
            }
        }
    }
}
