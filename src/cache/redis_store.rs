//! Redis cache store.
//!
//! Layout per bucket:
//! - `qc:{bucket}:e:{sub_key}` one string per entry, written with `SET .. EX ttl`
//! - `qc:{bucket}:idx` a set naming every entry key, used to drop the bucket

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::{CacheConfig, CacheError, CacheStore};

const KEY_PREFIX: &str = "qc";

/// Deletes every indexed entry in chunks, then the index itself.
const DELETE_BUCKET_SCRIPT: &str = r"
local members = redis.call('SMEMBERS', KEYS[1])
for i = 1, #members, 500 do
    redis.call('DEL', unpack(members, i, math.min(i + 499, #members)))
end
redis.call('DEL', KEYS[1])
return #members
";

/// Cache store backed by a shared Redis connection.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisCacheStore {
    /// Connect to Redis and verify the server answers.
    ///
    /// # Errors
    /// Returns error if the server cannot be reached; callers treat that as fatal.
    pub async fn connect(url: &str, config: &CacheConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Successfully connected to Redis");

        Ok(Self {
            conn,
            ttl_secs: config.ttl_secs(),
        })
    }
}

fn entry_key(bucket: &str, sub_key: &str) -> String {
    format!("{KEY_PREFIX}:{bucket}:e:{sub_key}")
}

fn index_key(bucket: &str) -> String {
    format!("{KEY_PREFIX}:{bucket}:idx")
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, bucket: &str, sub_key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(entry_key(bucket, sub_key)).await?;
        Ok(value)
    }

    async fn set(&self, bucket: &str, sub_key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = entry_key(bucket, sub_key);
        let index = index_key(bucket);
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);

        // The index outlives its newest entry, so it always covers every live key
        redis::pipe()
            .atomic()
            .set_ex(&key, value, self.ttl_secs)
            .ignore()
            .sadd(&index, &key)
            .ignore()
            .expire(&index, ttl)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::Script::new(DELETE_BUCKET_SCRIPT)
            .key(index_key(bucket))
            .invoke_async(&mut conn)
            .await?;
        debug!("Dropped {} entries from bucket {}", removed, bucket);
        Ok(())
    }
}
