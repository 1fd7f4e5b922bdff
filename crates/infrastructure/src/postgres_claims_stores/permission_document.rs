use async_trait::async_trait;
use serde_json::Value;
use sitegate_application::PermissionDocumentSource;
use sitegate_core::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::types::Json;

/// Well-known path of the permission document.
pub const PERMISSIONS_DOCUMENT_PATH: &str = "system/permissions";

/// Serves the permission document from the `system_documents` table.
#[derive(Clone)]
pub struct PostgresPermissionDocumentSource {
    pool: PgPool,
    path: String,
}

impl PostgresPermissionDocumentSource {
    /// Creates a source reading [`PERMISSIONS_DOCUMENT_PATH`].
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_path(pool, PERMISSIONS_DOCUMENT_PATH)
    }

    /// Creates a source reading a custom document path.
    #[must_use]
    pub fn with_path(pool: PgPool, path: impl Into<String>) -> Self {
        Self {
            pool,
            path: path.into(),
        }
    }
}

#[async_trait]
impl PermissionDocumentSource for PostgresPermissionDocumentSource {
    async fn fetch_permission_document(&self) -> AppResult<Value> {
        let document = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            SELECT document
            FROM system_documents
            WHERE path = $1
            "#,
        )
        .bind(self.path.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load permission document: {error}"))
        })?
        .ok_or_else(|| AppError::NotFound(format!("document '{}'", self.path)))?;

        Ok(document.0)
    }
}
