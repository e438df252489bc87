//! Memcached Store
//!
//! Delegates to a Memcached server through the blocking `memcache` client,
//! run on tokio's blocking pool. Values expire through Memcached's own TTL,
//! so no sweep is needed.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use memcache::{Client, CommandError, MemcacheError};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::{Store, Ttl, DEFAULT_KEY_PREFIX};
use crate::config::Config;
use crate::error::{validate_key, CacheError, Result};

/// Memcached reads expirations above 30 days as absolute Unix timestamps.
const MAX_RELATIVE_EXPIRATION: u64 = 60 * 60 * 24 * 30;

// == Memcached Store ==
/// Store backed by a Memcached server.
pub struct MemcachedStore {
    url: String,
    prefix: String,
    default_ttl: Duration,
    client: OnceCell<Arc<Client>>,
}

impl MemcachedStore {
    // == Open ==
    /// Creates a store for `url` (e.g. `memcache://127.0.0.1:11211`). An empty
    /// prefix selects `DEFAULT_KEY_PREFIX`.
    ///
    /// No connection is made until the first operation.
    pub fn open(url: &str, prefix: &str, default_ttl: Duration) -> Result<Self> {
        if !url.starts_with("memcache") {
            return Err(CacheError::Backend(format!("unsupported memcached URL: {url}")));
        }
        let prefix = if prefix.is_empty() {
            DEFAULT_KEY_PREFIX.to_string()
        } else {
            prefix.to_string()
        };

        Ok(Self {
            url: url.to_string(),
            prefix,
            default_ttl,
            client: OnceCell::new(),
        })
    }

    // == From Config ==
    /// Creates a store from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.memcached_url, &config.key_prefix, config.default_ttl())
    }

    // == Key ==
    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    // == Client ==
    /// Connects on first use; the client pools its own connections.
    async fn client(&self) -> Result<Arc<Client>> {
        self.client
            .get_or_try_init(|| async {
                let url = self.url.clone();
                debug!("memcached store: connecting to {}", url);
                let client = tokio::task::spawn_blocking(move || Client::connect(url))
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                Ok::<_, CacheError>(Arc::new(client))
            })
            .await
            .cloned()
    }

    // == Run ==
    /// Runs a blocking client call for `key` off the async workers.
    async fn run<T, F>(&self, key: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Client) -> std::result::Result<T, MemcacheError> + Send + 'static,
    {
        let client = self.client().await?;
        tokio::task::spawn_blocking(move || op(client.as_ref()))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?
            .map_err(|e| adapt_error(key, e))
    }
}

/// Maps client errors onto the shared taxonomy.
fn adapt_error(key: &str, e: MemcacheError) -> CacheError {
    match e {
        MemcacheError::CommandError(CommandError::KeyNotFound) => {
            CacheError::CacheMiss(key.to_string())
        }
        MemcacheError::CommandError(CommandError::KeyExists) => {
            CacheError::NotStored(format!("{key}: {e}"))
        }
        e @ MemcacheError::ClientError(_) => CacheError::InvalidKey(format!("{key}: {e}")),
        e => CacheError::Backend(e.to_string()),
    }
}

/// Expiration field for a resolved lifetime, 0 meaning "never".
///
/// Lifetimes are rounded up to whole seconds; long ones become absolute.
fn expiration(ttl: Option<Duration>) -> u32 {
    let Some(ttl) = ttl else {
        return 0;
    };
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    let secs = secs.max(1);

    if secs <= MAX_RELATIVE_EXPIRATION {
        return secs as u32;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    u32::try_from(now.saturating_add(secs)).unwrap_or(u32::MAX)
}

#[async_trait]
impl Store for MemcachedStore {
    async fn set(&self, key: &str, data: &[u8], ttl: Ttl) -> Result<()> {
        validate_key(key)?;
        let mapped = self.key(key);
        let data = data.to_vec();
        let exp = expiration(ttl.resolve(self.default_ttl));

        self.run(key, move |client| client.set(&mapped, data.as_slice(), exp))
            .await
            .map_err(|e| match e {
                CacheError::Backend(msg) => CacheError::NotStored(format!("{key}: {msg}")),
                other => other,
            })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let mapped = self.key(key);

        let value = self
            .run(key, move |client| client.get::<Vec<u8>>(&mapped))
            .await?;
        value.ok_or_else(|| CacheError::CacheMiss(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mapped = self.key(key);

        let removed = self.run(key, move |client| client.delete(&mapped)).await?;
        if !removed {
            return Err(CacheError::CacheMiss(key.to_string()));
        }
        Ok(())
    }

    /// Flushes every key on the server, not just prefixed ones.
    async fn flush(&self) -> Result<()> {
        self.run("", |client| client.flush()).await
    }

    async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_ok()
    }
}
