//! Configuration module for the storefront server.
//!
//! Loads configuration from environment variables (and `.env` when present).

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::auth::DEFAULT_COST;
use crate::cache::{CacheBackend, CacheConfig};
use crate::database::StoreBackend;
use crate::permissions::RolePolicy;
use crate::utils::parse_duration;

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // HTTP
    pub port: u16,
    pub app_env: AppEnv,
    /// Public origin used to build image URLs.
    pub base_url: String,

    // Document store
    pub store_backend: StoreBackend,
    pub database_uri: Option<String>,
    pub database_name: String,

    // Query cache
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    pub cache: CacheConfig,

    // Auth
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub bcrypt_cost: u32,
    pub role_policy: RolePolicy,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store_backend: StoreBackend = get("STORE_BACKEND")
            .as_deref()
            .unwrap_or("mongo")
            .parse()?;

        let database_uri = get("DATABASE");
        if store_backend == StoreBackend::Mongo && database_uri.is_none() {
            bail!("DATABASE must be set when STORE_BACKEND is mongo");
        }

        let cache_backend: CacheBackend = get("CACHE_BACKEND")
            .as_deref()
            .unwrap_or("redis")
            .parse()?;

        let redis_host = get("REDIS_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let redis_port: u16 = get("REDIS_PORT")
            .as_deref()
            .unwrap_or("6379")
            .parse()
            .context("REDIS_PORT must be a port number")?;

        let cache_ttl = match get("CACHE_TTL_SECS") {
            Some(raw) => parse_duration(&raw).context("CACHE_TTL_SECS must be a duration")?,
            None => Duration::from_secs(10),
        };
        let cache_capacity: u64 = get("CACHE_CAPACITY")
            .as_deref()
            .unwrap_or("10000")
            .parse()
            .context("CACHE_CAPACITY must be a number")?;

        let jwt_expires_in = match get("JWT_EXPIRES_IN") {
            Some(raw) => parse_duration(&raw).context("JWT_EXPIRES_IN must be a duration")?,
            None => Duration::from_secs(90 * 86400),
        };

        let bcrypt_cost: u32 = match get("BCRYPT_COST") {
            Some(raw) => raw.parse().context("BCRYPT_COST must be a number")?,
            None => DEFAULT_COST,
        };

        let role_policy = match get("ROLE_POLICY") {
            Some(raw) => raw.parse().context("ROLE_POLICY is malformed")?,
            None => RolePolicy::default(),
        };

        let app_env = match get("APP_ENV").as_deref() {
            Some("production") => AppEnv::Production,
            _ => AppEnv::Development,
        };

        let port: u16 = get("PORT")
            .as_deref()
            .unwrap_or("8000")
            .parse()
            .context("PORT must be a port number")?;

        Ok(Self {
            port,
            app_env,
            base_url: get("BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            store_backend,
            database_uri,
            database_name: get("DATABASE_NAME").unwrap_or_else(|| "storefront".to_string()),
            cache_backend,
            redis_url: format!("redis://{redis_host}:{redis_port}/"),
            cache: CacheConfig::with_capacity(cache_capacity).ttl(cache_ttl),
            jwt_secret: get("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expires_in,
            bcrypt_cost,
            role_policy,
        })
    }
}
