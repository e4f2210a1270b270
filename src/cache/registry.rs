//! Bucket registry - one moka cache per bucket key.

use dashmap::DashMap;
use tracing::debug;

use super::{CacheConfig, TypedCache};

/// Named buckets of cached query payloads.
///
/// Buckets are created lazily on first write and dropped wholesale on
/// invalidation, so deleting a bucket never touches its neighbours.
#[derive(Debug)]
pub struct BucketRegistry {
    buckets: DashMap<String, TypedCache<String, String>>,
    config: CacheConfig,
}

impl BucketRegistry {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// Get an existing bucket without creating it.
    pub fn get(&self, name: &str) -> Option<TypedCache<String, String>> {
        self.buckets.get(name).map(|entry| entry.value().clone())
    }

    /// Get a bucket, creating it with the registry config if missing.
    pub fn get_or_create(&self, name: &str) -> TypedCache<String, String> {
        if let Some(bucket) = self.get(name) {
            return bucket;
        }
        self.buckets
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating cache bucket: {}", name);
                TypedCache::new(name, &self.config)
            })
            .value()
            .clone()
    }

    /// Drop a bucket and everything in it.
    ///
    /// Returns `true` if the bucket existed.
    pub fn remove(&self, name: &str) -> bool {
        match self.buckets.remove(name) {
            Some((_, bucket)) => {
                // Handles still held by in-flight readers see an empty cache
                bucket.invalidate_all();
                debug!("Removed cache bucket: {}", bucket.name());
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_shares_bucket() {
        let registry = BucketRegistry::new(CacheConfig::default());
        assert!(registry.get("products").is_none());

        let a = registry.get_or_create("products");
        a.insert("k".to_string(), "v".to_string());
        let b = registry.get_or_create("products");
        assert_eq!(b.get(&"k".to_string()), Some("v".to_string()));
        assert_eq!(b.name(), "products");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_clears_only_that_bucket() {
        let registry = BucketRegistry::new(CacheConfig::default());
        let products = registry.get_or_create("products");
        let brands = registry.get_or_create("brands");
        products.insert("k".to_string(), "p".to_string());
        brands.insert("k".to_string(), "b".to_string());

        assert!(registry.remove("products"));
        assert!(!registry.remove("products"));
        assert_eq!(products.get(&"k".to_string()), None);
        assert_eq!(brands.get(&"k".to_string()), Some("b".to_string()));
        assert_eq!(brands.entry_count(), 1);
    }
}
