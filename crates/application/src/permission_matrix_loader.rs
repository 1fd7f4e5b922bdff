use std::sync::Arc;

use serde_json::Value;
use sitegate_core::{AppError, AppResult};
use sitegate_domain::typed_value::decode_document;
use tracing::warn;

use crate::PermissionDocumentSource;

/// Fetches the stored permission document and unwraps its typed-value encoding.
#[derive(Clone)]
pub struct PermissionMatrixLoader {
    source: Arc<dyn PermissionDocumentSource>,
}

impl PermissionMatrixLoader {
    /// Creates a loader over a document source.
    #[must_use]
    pub fn new(source: Arc<dyn PermissionDocumentSource>) -> Self {
        Self { source }
    }

    /// Returns the decoded document as plain JSON.
    ///
    /// Every malformed field is logged and the load fails with
    /// [`AppError::Decode`].
    pub async fn load(&self) -> AppResult<Value> {
        let raw = self.source.fetch_permission_document().await?;

        decode_document(&raw).map_err(|errors| {
            for error in &errors {
                warn!(field_error = %error, "permission document field failed to decode");
            }
            AppError::Decode(format!(
                "permission document has {} malformed field(s): {}",
                errors.len(),
                errors.join("; ")
            ))
        })
    }
}
