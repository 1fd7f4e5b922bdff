use async_trait::async_trait;
use sitegate_core::{AppResult, IdentitySelector, UserIdentity};
use sitegate_domain::CustomClaims;

/// Port to the identity provider that owns accounts and their fast-path claims.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves an account by uid or email.
    ///
    /// Unknown accounts fail with [`sitegate_core::AppError::IdentityResolution`].
    async fn resolve_identity(&self, selector: &IdentitySelector) -> AppResult<UserIdentity>;

    /// Reads the custom claims attached to an account.
    ///
    /// Accounts without custom claims yield [`CustomClaims::default`].
    async fn custom_claims(&self, uid: &str) -> AppResult<CustomClaims>;

    /// Replaces the custom claims attached to an account.
    async fn set_custom_claims(&self, uid: &str, claims: &CustomClaims) -> AppResult<()>;
}
