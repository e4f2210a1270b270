//! Bucket invalidation after writes.

use std::sync::Arc;

use tracing::{debug, warn};

use super::CacheStore;

/// Drops cached buckets after a write has changed their underlying data.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Option<Arc<dyn CacheStore>>,
}

impl CacheInvalidator {
    pub fn new(cache: Option<Arc<dyn CacheStore>>) -> Self {
        Self { cache }
    }

    /// Delete every entry in `bucket`.
    ///
    /// Failures are logged and swallowed: the write already succeeded and
    /// entries still expire on their TTL.
    pub async fn clear_bucket(&self, bucket: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.delete_bucket(bucket).await {
            Ok(()) => debug!("Invalidated cache bucket {}", bucket),
            Err(e) => warn!("Failed to invalidate cache bucket {}: {}", bucket, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, MemoryCacheStore};

    #[tokio::test]
    async fn test_clear_bucket() {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(CacheConfig::default()));
        cache.set("brands", "k", "v").await.unwrap();
        cache.set("products", "k", "v").await.unwrap();

        CacheInvalidator::new(Some(cache.clone())).clear_bucket("brands").await;

        assert_eq!(cache.get("brands", "k").await.unwrap(), None);
        assert!(cache.get("products", "k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_without_cache_is_noop() {
        CacheInvalidator::new(None).clear_bucket("brands").await;
    }
}
