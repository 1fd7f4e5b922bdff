use std::time::Duration;

use async_trait::async_trait;
use sitegate_core::AppResult;

/// Keyed cache port with per-entry expiry.
///
/// An entry is readable for exactly `ttl` after `set`; after that `get`
/// reports a miss. A zero `ttl` stores nothing.
#[async_trait]
pub trait TtlCache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns the live value for `key`, if any.
    async fn get(&self, key: &str) -> AppResult<Option<V>>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: V, ttl: Duration) -> AppResult<()>;
}
