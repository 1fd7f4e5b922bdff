use async_trait::async_trait;
use serde_json::Value;
use sitegate_core::AppResult;

/// Source port for the stored permission document.
#[async_trait]
pub trait PermissionDocumentSource: Send + Sync {
    /// Fetches the raw document in its typed-value wire form
    /// (`{"fields": {...}}`).
    async fn fetch_permission_document(&self) -> AppResult<Value>;
}
