//! Shared primitives for all Rust crates in Sitegate.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use thiserror::Error;

pub use auth::{IdentitySelector, UserIdentity};

/// Result type used across Sitegate crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Stored document could not be decoded into native values.
    #[error("decode error: {0}")]
    Decode(String),

    /// Target identity (uid or email) could not be resolved.
    #[error("identity resolution failed: {0}")]
    IdentityResolution(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn identity_resolution_error_names_the_target() {
        let error = AppError::IdentityResolution("no user with email 'a@x.test'".to_owned());
        assert_eq!(
            error.to_string(),
            "identity resolution failed: no user with email 'a@x.test'"
        );
    }
}
