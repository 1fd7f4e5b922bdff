use std::env;
use std::time::Duration;

use sitegate_core::{AppError, AppResult};

const DEFAULT_IDENTITY_API_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Environment settings of the claims admin tool.
#[derive(Debug, Clone)]
pub struct ClaimsAdminConfig {
    pub database_url: String,
    pub identity_api_base_url: String,
    pub identity_access_token: String,
    pub permissions_cache_ttl: Duration,
    pub identity_http_timeout: Duration,
}

impl ClaimsAdminConfig {
    pub fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let identity_api_base_url = env::var("IDENTITY_API_BASE_URL")
            .ok()
            .map(|value| value.trim().trim_end_matches('/').to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_IDENTITY_API_BASE_URL.to_owned());
        let identity_access_token = required_env("IDENTITY_ACCESS_TOKEN")?;
        let permissions_cache_ttl_ms = parse_env_u64("PERMISSIONS_CACHE_TTL_MS", 300_000)?;
        let identity_http_timeout_secs = parse_env_u64("IDENTITY_HTTP_TIMEOUT_SECS", 15)?;

        if identity_http_timeout_secs == 0 {
            return Err(AppError::Validation(
                "IDENTITY_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            identity_api_base_url,
            identity_access_token,
            permissions_cache_ttl: Duration::from_millis(permissions_cache_ttl_ms),
            identity_http_timeout: Duration::from_secs(identity_http_timeout_secs),
        })
    }
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
