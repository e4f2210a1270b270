//! Shared application state.

use std::sync::Arc;

use crate::auth::{PasswordHasher, ResetCodeSender, TokenIssuer};
use crate::cache::{CacheInvalidator, CacheStore, QueryCache};
use crate::config::{AppEnv, Config};
use crate::database::DocumentStore;
use crate::permissions::Permissions;

use super::response::Presenter;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Document store for writes and uncached reads.
    pub store: Arc<dyn DocumentStore>,

    /// Read path with opt-in caching.
    pub queries: QueryCache,

    /// Drops cache buckets after writes.
    pub invalidator: CacheInvalidator,

    pub tokens: TokenIssuer,
    pub passwords: PasswordHasher,

    /// Permission checker for route guards.
    pub permissions: Permissions,

    pub reset_codes: Arc<dyn ResetCodeSender>,

    /// Renders stored documents as JSON.
    pub presenter: Presenter,

    /// Mark the auth cookie `Secure`.
    pub secure_cookies: bool,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        cache: Option<Arc<dyn CacheStore>>,
        reset_codes: Arc<dyn ResetCodeSender>,
    ) -> Self {
        Self {
            queries: QueryCache::new(store.clone(), cache.clone()),
            invalidator: CacheInvalidator::new(cache),
            store,
            tokens: TokenIssuer::new(&config.jwt_secret, config.jwt_expires_in),
            passwords: PasswordHasher::new(config.bcrypt_cost),
            permissions: Permissions::new(config.role_policy.clone()),
            reset_codes,
            presenter: Presenter::new(&config.base_url),
            secure_cookies: config.app_env == AppEnv::Production,
        }
    }
}
