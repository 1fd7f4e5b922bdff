use async_trait::async_trait;
use sitegate_application::ProfileRepository;
use sitegate_core::{AppError, AppResult};
use sitegate_domain::UserRole;
use sqlx::PgPool;
use sqlx::types::Json;

/// PostgreSQL-backed profile record store.
#[derive(Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find_profile_roles(&self, uid: &str) -> AppResult<Option<Vec<UserRole>>> {
        let roles = sqlx::query_scalar::<_, Json<Vec<UserRole>>>(
            r#"
            SELECT roles
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load profile roles: {error}")))?;

        Ok(roles.map(|Json(roles)| roles))
    }

    async fn save_profile_roles(&self, uid: &str, roles: &[UserRole]) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET roles = $2, updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(uid)
        .bind(Json(roles))
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save profile roles: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "profile record for uid '{uid}'"
            )));
        }

        Ok(())
    }
}
