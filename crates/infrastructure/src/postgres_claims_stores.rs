//! PostgreSQL adapters for the stores the claims synchronizer and the
//! permission loader read and write.

mod mirror;
mod permission_document;
mod profiles;
mod sites;


pub use mirror::PostgresClaimsMirrorRepository;
pub use permission_document::{PERMISSIONS_DOCUMENT_PATH, PostgresPermissionDocumentSource};
pub use profiles::PostgresProfileRepository;
pub use sites::PostgresSiteDirectory;
