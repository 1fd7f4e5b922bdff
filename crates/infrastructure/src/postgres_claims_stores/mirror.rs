use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitegate_application::{ClaimsMirrorEntry, ClaimsMirrorRepository};
use sitegate_core::{AppError, AppResult};
use sitegate_domain::CustomClaims;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

#[derive(Debug, FromRow)]
struct ClaimsMirrorRow {
    claims: Json<CustomClaims>,
    last_updated: DateTime<Utc>,
}

/// PostgreSQL-backed claims mirror.
#[derive(Clone)]
pub struct PostgresClaimsMirrorRepository {
    pool: PgPool,
}

impl PostgresClaimsMirrorRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClaimsMirrorRepository for PostgresClaimsMirrorRepository {
    async fn find_claims_mirror(&self, uid: &str) -> AppResult<Option<ClaimsMirrorEntry>> {
        let row = sqlx::query_as::<_, ClaimsMirrorRow>(
            r#"
            SELECT claims, last_updated
            FROM user_claims
            WHERE user_id = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load claims mirror: {error}")))?;

        Ok(row.map(|row| ClaimsMirrorEntry {
            claims: row.claims.0,
            last_updated: row.last_updated,
        }))
    }

    async fn save_claims_mirror(
        &self,
        uid: &str,
        claims: &CustomClaims,
        last_updated: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_claims (user_id, claims, last_updated)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET claims = EXCLUDED.claims, last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(uid)
        .bind(Json(claims))
        .bind(last_updated)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save claims mirror: {error}")))?;

        Ok(())
    }
}
