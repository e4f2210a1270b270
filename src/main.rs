//! Storefront - E-commerce catalog backend
//!
//! REST API for products, categories, subcategories, brands and users,
//! with a cache-aside query layer in front of the document store.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - Document store trait, MongoDB and in-memory backends
//! - `cache` - Query cache over Redis or Moka
//! - `permissions` - Role to permission policy
//! - `auth` - Tokens, password hashing and reset codes
//! - `resources` - Per-entity validation and metadata
//! - `handlers` - Route handlers
//! - `server` - Router, guards and response rendering
//! - `utils` - Utility functions

mod auth;
mod cache;
mod config;
mod database;
mod error;
mod handlers;
mod permissions;
mod resources;
mod server;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::LogResetSender;
use config::Config;
use database::{DocumentStore, MemoryStore, MongoStore, StoreBackend};
use server::AppState;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so `.env` can set RUST_LOG
    let config = Config::from_env().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("storefront=info,tower_http=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting storefront...");
    info!("Environment: {:?}", config.app_env);

    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Mongo => {
            let uri = config
                .database_uri
                .as_deref()
                .context("DATABASE must be set for the mongo store")?;
            info!("Connecting to MongoDB...");
            Arc::new(MongoStore::connect(uri, &config.database_name).await?)
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Arc::new(MemoryStore::new())
        }
    };

    resources::ensure_indexes(store.as_ref())
        .await
        .context("failed to create unique indexes")?;

    let cache = cache::connect(config.cache_backend, &config.cache, &config.redis_url).await?;

    let state = AppState::new(&config, store, cache, Arc::new(LogResetSender));

    server::serve(&config, state).await
}
