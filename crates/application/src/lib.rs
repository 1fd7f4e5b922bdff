//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_front_door;
mod claims_ports;
mod claims_sync_service;
mod permission_matrix_loader;
mod permission_ports;
mod permission_service;

pub use authorization_front_door::{AuthorizationFrontDoor, SessionState};
pub use claims_ports::{
    ClaimsMirrorEntry, ClaimsMirrorRepository, IdentityProvider, ProfileRepository, SiteDirectory,
    SiteRecord,
};
pub use claims_sync_service::{
    ClaimsChangeSet, ClaimsDriftReport, ClaimsOperation, ClaimsSyncService, SiteAdminAssignment,
    SyncMode,
};
pub use permission_matrix_loader::PermissionMatrixLoader;
pub use permission_ports::{PermissionDocumentSource, TtlCache};
pub use permission_service::{
    DEFAULT_PERMISSIONS_CACHE_KEY, DEFAULT_PERMISSIONS_CACHE_TTL, PermissionLoadOutcome,
    PermissionLoadState, PermissionService, PermissionServiceConfig,
};
