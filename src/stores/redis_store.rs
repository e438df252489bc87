//! Redis Store
//!
//! Thin delegation to a Redis server. Values are stored as raw bytes under a
//! key prefix and expire through Redis' own TTL, so no sweep is needed.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::cache::{Store, Ttl, DEFAULT_KEY_PREFIX};
use crate::config::Config;
use crate::error::{validate_key, CacheError, Result};

// == Redis Store ==
/// Store backed by a Redis database.
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
    default_ttl: Duration,
}

impl RedisStore {
    // == Open ==
    /// Creates a store for `url`. An empty prefix selects `DEFAULT_KEY_PREFIX`.
    ///
    /// No connection is made until the first operation.
    pub fn open(url: &str, prefix: &str, default_ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(url).map_err(backend_error)?;
        let prefix = if prefix.is_empty() {
            DEFAULT_KEY_PREFIX.to_string()
        } else {
            prefix.to_string()
        };

        Ok(Self {
            client,
            prefix,
            default_ttl,
        })
    }

    // == From Config ==
    /// Creates a store from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.redis_url, &config.key_prefix, config.default_ttl())
    }

    // == Key ==
    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    // == Connection ==
    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_error)
    }
}

fn backend_error(e: redis::RedisError) -> CacheError {
    CacheError::Backend(e.to_string())
}

#[async_trait]
impl Store for RedisStore {
    async fn set(&self, key: &str, data: &[u8], ttl: Ttl) -> Result<()> {
        validate_key(key)?;
        let mut conn = self
            .connection()
            .await
            .map_err(|e| CacheError::NotStored(e.to_string()))?;

        let result: redis::RedisResult<()> = match ttl.resolve(self.default_ttl) {
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                conn.pset_ex(self.key(key), data, millis).await
            }
            None => conn.set(self.key(key), data).await,
        };

        result.map_err(|e| CacheError::NotStored(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let mut conn = self.connection().await?;

        let value: Option<Vec<u8>> = conn.get(self.key(key)).await.map_err(backend_error)?;
        value.ok_or_else(|| CacheError::CacheMiss(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut conn = self.connection().await?;

        let removed: i64 = conn.del(self.key(key)).await.map_err(backend_error)?;
        if removed == 0 {
            return Err(CacheError::CacheMiss(key.to_string()));
        }
        Ok(())
    }

    /// Flushes the whole selected database, not just prefixed keys.
    async fn flush(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn has(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        conn.exists(self.key(key)).await.unwrap_or(false)
    }
}
