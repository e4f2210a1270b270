//! Query cache - cache-aside reads over the document store.
//!
//! ## Architecture
//!
//! - `CacheStore` - physical storage for `(bucket, sub_key)` entries,
//!   implemented by `RedisCacheStore` and the moka-backed `MemoryCacheStore`
//! - `QueryCache` - executes read queries, serving from and populating a
//!   named bucket when the caller asks for it
//! - `CacheInvalidator` - drops whole buckets after writes
//!
//! ## Usage
//!
//! ```rust
//! let cache = cache::connect(CacheBackend::Memory, &config, &redis_url).await?;
//! let queries = QueryCache::new(store.clone(), cache.clone());
//!
//! let output = queries.execute_with_cache(&query, "products").await?;
//! CacheInvalidator::new(cache).clear_bucket("products").await;
//! ```

mod config;
mod invalidation;
mod key;
mod memory;
mod query;
mod redis_store;
mod registry;
mod store;
mod typed;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

pub use config::CacheConfig;
pub use invalidation::CacheInvalidator;
pub use memory::MemoryCacheStore;
pub use query::QueryCache;
pub use redis_store::RedisCacheStore;
pub use registry::BucketRegistry;
pub use store::{CacheError, CacheStore};
pub use typed::TypedCache;

/// Which cache store backs the query cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
    /// Every cached read goes straight to the store.
    Disabled,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            other => anyhow::bail!("unknown cache backend '{other}'"),
        }
    }
}

/// Build the cache store for the configured backend.
///
/// # Errors
/// Fails if Redis is selected and unreachable.
pub async fn connect(
    backend: CacheBackend,
    config: &CacheConfig,
    redis_url: &str,
) -> anyhow::Result<Option<Arc<dyn CacheStore>>> {
    let store: Option<Arc<dyn CacheStore>> = match backend {
        CacheBackend::Redis => Some(Arc::new(
            RedisCacheStore::connect(redis_url, config)
                .await
                .with_context(|| format!("failed to connect to redis at {redis_url}"))?,
        )),
        CacheBackend::Memory => Some(Arc::new(MemoryCacheStore::new(config.clone()))),
        CacheBackend::Disabled => None,
    };

    match &store {
        Some(store) => info!(
            "Query cache enabled ({}, ttl {}s)",
            store.name(),
            config.ttl.as_secs_f32()
        ),
        None => info!("Query cache disabled"),
    }
    Ok(store)
}
