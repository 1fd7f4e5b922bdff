//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod identity_toolkit_provider;
mod in_memory_claims_stores;
mod in_memory_ttl_cache;
mod postgres_claims_stores;

pub use identity_toolkit_provider::{
    IdentityToolkitConfig, IdentityToolkitProvider, MAX_CUSTOM_CLAIMS_BYTES,
};
pub use in_memory_claims_stores::{
    InMemoryClaimsMirrorRepository, InMemoryIdentityProvider, InMemoryPermissionDocumentSource,
    InMemoryProfileRepository, InMemorySiteDirectory,
};
pub use in_memory_ttl_cache::InMemoryTtlCache;
pub use postgres_claims_stores::{
    PERMISSIONS_DOCUMENT_PATH, PostgresClaimsMirrorRepository, PostgresPermissionDocumentSource,
    PostgresProfileRepository, PostgresSiteDirectory,
};
