//! In-process cache store backed by moka.

use async_trait::async_trait;

use super::{BucketRegistry, CacheConfig, CacheError, CacheStore};

#[derive(Debug)]
pub struct MemoryCacheStore {
    buckets: BucketRegistry,
}

impl MemoryCacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            buckets: BucketRegistry::new(config),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, bucket: &str, sub_key: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .buckets
            .get(bucket)
            .and_then(|cache| cache.get(&sub_key.to_string())))
    }

    async fn set(&self, bucket: &str, sub_key: &str, value: &str) -> Result<(), CacheError> {
        self.buckets
            .get_or_create(bucket)
            .insert(sub_key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), CacheError> {
        self.buckets.remove(bucket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_set_get_and_delete_bucket() {
        let store = MemoryCacheStore::new(CacheConfig::default());
        assert_eq!(store.get("brands", "a").await.unwrap(), None);

        store.set("brands", "a", "1").await.unwrap();
        store.set("brands", "b", "2").await.unwrap();
        store.set("products", "a", "3").await.unwrap();
        assert_eq!(store.get("brands", "a").await.unwrap().as_deref(), Some("1"));

        store.delete_bucket("brands").await.unwrap();
        assert_eq!(store.get("brands", "a").await.unwrap(), None);
        assert_eq!(store.get("brands", "b").await.unwrap(), None);
        assert_eq!(store.get("products", "a").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let config = CacheConfig::default().ttl(Duration::from_millis(50));
        let store = MemoryCacheStore::new(config);
        store.set("brands", "a", "1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(store.get("brands", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_is_per_entry() {
        let config = CacheConfig::default().ttl(Duration::from_millis(150));
        let store = MemoryCacheStore::new(config);
        store.set("brands", "old", "1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        // A fresh write to the same bucket does not extend older entries
        store.set("brands", "new", "2").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.get("brands", "old").await.unwrap(), None);
        assert_eq!(store.get("brands", "new").await.unwrap().as_deref(), Some("2"));
    }
}
