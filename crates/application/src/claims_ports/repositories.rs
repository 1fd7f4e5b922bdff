use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitegate_core::AppResult;
use sitegate_domain::{CustomClaims, UserRole};

/// Repository port for the authoritative profile role list.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Returns the profile role list, or `None` when no profile exists.
    async fn find_profile_roles(&self, uid: &str) -> AppResult<Option<Vec<UserRole>>>;

    /// Replaces the profile role list of an existing profile.
    async fn save_profile_roles(&self, uid: &str, roles: &[UserRole]) -> AppResult<()>;
}

/// Stored copy of an account's claims.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimsMirrorEntry {
    /// Mirrored claims.
    pub claims: CustomClaims,
    /// Time of the last mirror write.
    pub last_updated: DateTime<Utc>,
}

/// Repository port for the claims mirror record.
#[async_trait]
pub trait ClaimsMirrorRepository: Send + Sync {
    /// Returns the mirror record, if any.
    async fn find_claims_mirror(&self, uid: &str) -> AppResult<Option<ClaimsMirrorEntry>>;

    /// Upserts the mirror record.
    async fn save_claims_mirror(
        &self,
        uid: &str,
        claims: &CustomClaims,
        last_updated: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Top-level site row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    /// Site identifier.
    pub site_id: String,
    /// Site display name.
    pub name: String,
}

/// Lookup port for top-level sites.
#[async_trait]
pub trait SiteDirectory: Send + Sync {
    /// Returns every site whose name equals `name` exactly.
    async fn find_sites_by_name(&self, name: &str) -> AppResult<Vec<SiteRecord>>;
}
