//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod claims;
mod org;
mod permission_matrix;
mod principal;
mod role;
pub mod typed_value;

pub use claims::{CustomClaims, DerivedRoleMaps};
pub use org::{OrgHierarchy, OrgKind, OrgNode};
pub use permission_matrix::{PermissionKey, PermissionMatrix};
pub use principal::AuthenticatedUser;
pub use role::{
    ANY_SITE_ID, RoleName, UserRole, dedupe_roles, has_minimum_role, highest_role, remove_role,
    union_role,
};
