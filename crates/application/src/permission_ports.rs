mod cache;
mod document_source;

pub use cache::TtlCache;
pub use document_source::PermissionDocumentSource;
