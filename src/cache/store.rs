//! Cache store client abstraction.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache encode: {0}")]
    Encode(String),

    #[error("cache decode: {0}")]
    Decode(String),
}

/// Physical storage for cached query payloads, addressed by
/// `(bucket, sub_key)`.
///
/// Every entry written with `set` expires after the store's configured TTL.
/// Entries are only removed early in bulk, one bucket at a time.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Returns `None` if there is no entry or it has expired.
    async fn get(&self, bucket: &str, sub_key: &str) -> Result<Option<String>, CacheError>;

    /// Write an entry and start its TTL.
    async fn set(&self, bucket: &str, sub_key: &str, value: &str) -> Result<(), CacheError>;

    /// Remove every entry in the bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), CacheError>;
}
