use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sitegate_application::TtlCache;
use sitegate_core::AppResult;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct TtlCacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory [`TtlCache`] adapter.
///
/// Expired entries are dropped lazily on read.
pub struct InMemoryTtlCache<V> {
    entries: RwLock<HashMap<String, TtlCacheEntry<V>>>,
}

impl<V> Default for InMemoryTtlCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> InMemoryTtlCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<V> TtlCache<V> for InMemoryTtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> AppResult<Option<V>> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if entry.expires_at > Instant::now() {
                    return Ok(Some(entry.value.clone()));
                }
            } else {
                return Ok(None);
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) -> AppResult<()> {
        if ttl.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or(now);

        self.entries
            .write()
            .await
            .insert(key.to_owned(), TtlCacheEntry { value, expires_at });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sitegate_application::TtlCache;

    use super::InMemoryTtlCache;

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let cache = InMemoryTtlCache::<u32>::new();
        assert!(cache.set("matrix", 7_u32, Duration::from_millis(300)).await.is_ok());

        tokio::time::advance(Duration::from_millis(299)).await;
        assert_eq!(cache.get("matrix").await.ok().flatten(), Some(7));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("matrix").await.ok().flatten(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_stores_nothing() {
        let cache = InMemoryTtlCache::<String>::new();
        assert!(cache.set("matrix", "v1".to_owned(), Duration::ZERO).await.is_ok());
        assert_eq!(cache.get("matrix").await.ok().flatten(), None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn set_replaces_value_and_expiry() {
        let cache = InMemoryTtlCache::<u8>::new();
        assert!(cache.set("matrix", 1_u8, Duration::from_secs(1)).await.is_ok());
        tokio::time::advance(Duration::from_millis(900)).await;
        assert!(cache.set("matrix", 2_u8, Duration::from_secs(1)).await.is_ok());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(cache.get("matrix").await.ok().flatten(), Some(2));
        assert_eq!(cache.get("other").await.ok().flatten(), None);
    }
}
