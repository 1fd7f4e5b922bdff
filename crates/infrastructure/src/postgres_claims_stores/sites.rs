use async_trait::async_trait;
use sitegate_application::{SiteDirectory, SiteRecord};
use sitegate_core::{AppError, AppResult};
use sqlx::{FromRow, PgPool};

#[derive(Debug, FromRow)]
struct SiteRow {
    site_id: String,
    name: String,
}

/// PostgreSQL-backed site directory.
#[derive(Clone)]
pub struct PostgresSiteDirectory {
    pool: PgPool,
}

impl PostgresSiteDirectory {
    /// Creates a directory with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteDirectory for PostgresSiteDirectory {
    async fn find_sites_by_name(&self, name: &str) -> AppResult<Vec<SiteRecord>> {
        let rows = sqlx::query_as::<_, SiteRow>(
            r#"
            SELECT site_id, name
            FROM sites
            WHERE name = $1
            ORDER BY site_id
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up sites: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| SiteRecord {
                site_id: row.site_id,
                name: row.name,
            })
            .collect())
    }
}
