//! Cache-aside execution of read queries.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{CacheStore, key};
use crate::database::{DocumentStore, Query, QueryOutput, StoreError};

/// Runs read queries against the document store, optionally through the
/// cache.
///
/// Cache participation is decided at each call site: `execute` never
/// touches the cache, `execute_with_cache` reads and populates the named
/// bucket. Cache failures of any kind degrade to a direct store read.
#[derive(Clone)]
pub struct QueryCache {
    store: Arc<dyn DocumentStore>,
    cache: Option<Arc<dyn CacheStore>>,
}

impl QueryCache {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Option<Arc<dyn CacheStore>>) -> Self {
        Self { store, cache }
    }

    /// Execute directly against storage.
    pub async fn execute(&self, query: &Query) -> Result<QueryOutput, StoreError> {
        query.execute(self.store.as_ref()).await
    }

    /// Execute through the cache when a bucket is given.
    pub async fn execute_in(
        &self,
        query: &Query,
        bucket: Option<&str>,
    ) -> Result<QueryOutput, StoreError> {
        match bucket {
            Some(bucket) => self.execute_with_cache(query, bucket).await,
            None => self.execute(query).await,
        }
    }

    /// Serve from `bucket` if present, otherwise execute and populate it.
    pub async fn execute_with_cache(
        &self,
        query: &Query,
        bucket: &str,
    ) -> Result<QueryOutput, StoreError> {
        let Some(cache) = &self.cache else {
            return self.execute(query).await;
        };

        let sub_key = key::sub_key(query);

        match cache.get(bucket, &sub_key).await {
            Ok(Some(payload)) => match key::decode(query, &payload) {
                Ok(output) => {
                    debug!("Cache hit: {} ({})", bucket, query.collection());
                    return Ok(output);
                }
                Err(e) => warn!("Discarding unreadable cache entry in {}: {}", bucket, e),
            },
            Ok(None) => debug!("Cache miss: {} ({})", bucket, query.collection()),
            Err(e) => warn!("Cache {} read failed, using store: {}", cache.name(), e),
        }

        let output = self.execute(query).await?;

        match key::encode(&output) {
            Ok(payload) => {
                if let Err(e) = cache.set(bucket, &sub_key, &payload).await {
                    warn!("Cache {} write failed: {}", cache.name(), e);
                }
            }
            Err(e) => warn!("Failed to encode result for cache: {}", e),
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use mongodb::bson::{Document, doc};

    use super::*;
    use crate::cache::{CacheConfig, CacheError, CacheInvalidator, MemoryCacheStore};
    use crate::database::testing::CountingStore;
    use crate::database::{FindOptions, MemoryStore};

    /// Cache store whose every call fails.
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _: &str, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Decode("down".into()))
        }

        async fn set(&self, _: &str, _: &str, _: &str) -> Result<(), CacheError> {
            Err(CacheError::Encode("down".into()))
        }

        async fn delete_bucket(&self, _: &str) -> Result<(), CacheError> {
            Err(CacheError::Encode("down".into()))
        }
    }

    /// Cache store that hands back garbage for every key.
    struct CorruptCache(AtomicUsize);

    #[async_trait]
    impl CacheStore for CorruptCache {
        fn name(&self) -> &'static str {
            "corrupt"
        }

        async fn get(&self, _: &str, _: &str) -> Result<Option<String>, CacheError> {
            Ok(Some("{\"not\": \"an array\"}".into()))
        }

        async fn set(&self, _: &str, _: &str, _: &str) -> Result<(), CacheError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete_bucket(&self, _: &str) -> Result<(), CacheError> {
            Ok(())
        }
    }

    async fn seeded(n: i32) -> Arc<CountingStore> {
        let store = Arc::new(CountingStore::new(MemoryStore::new()));
        for i in 0..n {
            store.insert("brands", doc! { "name": format!("b{i}"), "n": i }).await.unwrap();
        }
        store
    }

    fn page(skip: u64) -> Query {
        Query::find(
            "brands",
            Document::new(),
            FindOptions {
                sort: vec![("n".into(), 1)],
                skip,
                limit: Some(2),
                projection: None,
            },
        )
    }

    fn memory_cache(ttl: Duration) -> Arc<dyn CacheStore> {
        Arc::new(MemoryCacheStore::new(CacheConfig::default().ttl(ttl)))
    }

    #[tokio::test]
    async fn test_second_identical_query_hits_cache() {
        let store = seeded(3).await;
        let queries = QueryCache::new(store.clone(), Some(memory_cache(Duration::from_secs(10))));

        let first = queries.execute_with_cache(&page(0), "brands").await.unwrap();
        let second = queries.execute_with_cache(&page(0), "brands").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn test_pages_cached_independently() {
        let store = seeded(5).await;
        let queries = QueryCache::new(store.clone(), Some(memory_cache(Duration::from_secs(10))));

        let p1 = queries.execute_with_cache(&page(0), "brands").await.unwrap();
        let p2 = queries.execute_with_cache(&page(2), "brands").await.unwrap();
        assert_ne!(p1, p2);
        assert_eq!(store.reads(), 2);

        queries.execute_with_cache(&page(2), "brands").await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_store_again() {
        let store = seeded(1).await;
        let queries = QueryCache::new(store.clone(), Some(memory_cache(Duration::from_millis(50))));

        queries.execute_with_cache(&page(0), "brands").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        queries.execute_with_cache(&page(0), "brands").await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_invalidation_forces_miss() {
        let store = seeded(1).await;
        let cache = memory_cache(Duration::from_secs(10));
        let queries = QueryCache::new(store.clone(), Some(cache.clone()));
        let invalidator = CacheInvalidator::new(Some(cache));

        queries.execute_with_cache(&page(0), "brands").await.unwrap();
        store.insert("brands", doc! { "name": "late", "n": -1 }).await.unwrap();
        invalidator.clear_bucket("brands").await;

        let fresh = queries.execute_with_cache(&page(0), "brands").await.unwrap();
        assert_eq!(store.reads(), 2);
        assert_eq!(fresh.into_many()[0].get_str("name").unwrap(), "late");
    }

    #[tokio::test]
    async fn test_unmarked_queries_bypass_cache() {
        let store = seeded(1).await;
        let queries = QueryCache::new(store.clone(), Some(memory_cache(Duration::from_secs(10))));

        queries.execute(&page(0)).await.unwrap();
        queries.execute_in(&page(0), None).await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_is_passthrough() {
        let store = seeded(1).await;
        let queries = QueryCache::new(store.clone(), None);

        queries.execute_with_cache(&page(0), "brands").await.unwrap();
        queries.execute_with_cache(&page(0), "brands").await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_cache_failure_falls_back_to_store() {
        let store = seeded(2).await;
        let queries = QueryCache::new(store.clone(), Some(Arc::new(BrokenCache)));

        let output = queries.execute_with_cache(&page(0), "brands").await.unwrap();
        assert_eq!(output.count(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_treated_as_miss() {
        let store = seeded(2).await;
        let cache = Arc::new(CorruptCache(AtomicUsize::new(0)));
        let queries = QueryCache::new(store.clone(), Some(cache.clone()));

        let output = queries.execute_with_cache(&page(0), "brands").await.unwrap();
        assert_eq!(output.count(), 2);
        assert_eq!(store.reads(), 1);
        assert_eq!(cache.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_count_and_find_one_are_cached() {
        let store = seeded(3).await;
        let queries = QueryCache::new(store.clone(), Some(memory_cache(Duration::from_secs(10))));

        let count = Query::count("brands", Document::new());
        let one = Query::find_one("brands", doc! { "name": "b1" });
        let missing = Query::find_one("brands", doc! { "name": "nope" });

        for _ in 0..2 {
            assert_eq!(queries.execute_with_cache(&count, "brands").await.unwrap().count(), 3);
            assert!(queries.execute_with_cache(&one, "brands").await.unwrap().into_one().is_some());
            assert!(queries.execute_with_cache(&missing, "brands").await.unwrap().into_one().is_none());
        }
        assert_eq!(store.reads(), 3);
    }
}
