//! In-Memory Store
//!
//! A map guarded by one reader/writer lock, with lazy eviction on read and an
//! optional periodic sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{
    default_key_fn, CacheStats, GarbageCollector, Item, KeyFn, StatsRecorder, Store, Ttl,
    DEFAULT_TTL,
};
use crate::config::Config;
use crate::error::{validate_key, CacheError, Result};
use crate::tasks::{spawn_gc_task, GcHandle};

type Entries = Arc<RwLock<HashMap<String, Item>>>;

// == Options ==
/// Construction options for `MemoryStore`.
#[derive(Clone)]
pub struct MemoryOptions {
    /// Lifetime of entries set with `Ttl::Default`
    pub default_ttl: Duration,
    /// Interval of the background sweep, None = no sweep
    pub gc_interval: Option<Duration>,
    /// Initial map capacity
    pub capacity: usize,
    /// Caller key to map key
    pub key_fn: KeyFn,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            gc_interval: None,
            capacity: 0,
            key_fn: default_key_fn(),
        }
    }
}

impl MemoryOptions {
    /// Builds options from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_ttl: config.default_ttl(),
            gc_interval: config.gc_interval(),
            capacity: config.capacity,
            key_fn: crate::cache::prefixed(config.key_prefix.clone()),
        }
    }

    /// Sets the background sweep interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = Some(interval);
        self
    }

    /// Sets the default TTL. A zero TTL keeps `DEFAULT_TTL`.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = if ttl.is_zero() { DEFAULT_TTL } else { ttl };
        self
    }

    /// Sets the key function.
    pub fn with_key_fn(mut self, key_fn: KeyFn) -> Self {
        self.key_fn = key_fn;
        self
    }
}

// == Memory Store ==
/// In-process store.
///
/// The map is owned by this instance and shared only with its own sweep
/// task, which stops when the store is dropped.
pub struct MemoryStore {
    entries: Entries,
    stats: Arc<StatsRecorder>,
    default_ttl: Duration,
    key_fn: KeyFn,
    gc_task: Option<GcHandle>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store with default options and no background sweep.
    pub fn new() -> Self {
        Self::with_options(MemoryOptions::default())
    }

    /// Creates a store from options.
    ///
    /// The background sweep only starts inside a tokio runtime and with an
    /// interval of at least `MIN_GC_INTERVAL`.
    pub fn with_options(options: MemoryOptions) -> Self {
        let entries: Entries = Arc::new(RwLock::new(HashMap::with_capacity(options.capacity)));
        let stats = Arc::new(StatsRecorder::default());

        let gc_task = options.gc_interval.and_then(|interval| {
            let entries = entries.clone();
            let stats = stats.clone();
            spawn_gc_task("memory", interval, move || {
                let entries = entries.clone();
                let stats = stats.clone();
                async move { Ok(sweep(&entries, &stats).await) }
            })
        });

        Self {
            entries,
            stats,
            default_ttl: options.default_ttl,
            key_fn: options.key_fn,
            gc_task,
        }
    }

    // == Length ==
    /// Returns the number of entries held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    // == Stats ==
    /// Returns current store statistics.
    pub async fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len().await)
    }

    /// Returns true while the background sweep is running.
    pub fn gc_running(&self) -> bool {
        self.gc_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the background sweep and waits for it to exit.
    pub async fn stop_gc(&mut self) {
        if let Some(task) = self.gc_task.take() {
            task.shutdown().await;
        }
    }

    /// Removes `key` if it is still expired.
    ///
    /// Runs after the read lock is released; the re-check keeps it idempotent
    /// and avoids evicting a value a concurrent `set` just replaced.
    async fn evict_expired(&self, key: &str) {
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(Item::is_expired) {
            entries.remove(key);
            self.stats.record_expirations(1);
            debug!("memory store: evicted expired key {}", key);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes every expired entry, returning how many were removed.
async fn sweep(entries: &RwLock<HashMap<String, Item>>, stats: &StatsRecorder) -> usize {
    let mut entries = entries.write().await;
    let before = entries.len();
    entries.retain(|_, item| !item.is_expired());
    let removed = before - entries.len();
    stats.record_expirations(removed);
    removed
}

#[async_trait]
impl Store for MemoryStore {
    async fn set(&self, key: &str, data: &[u8], ttl: Ttl) -> Result<()> {
        validate_key(key)?;
        let item = Item::new(data.to_vec(), ttl, self.default_ttl);
        self.entries.write().await.insert((self.key_fn)(key), item);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let mapped = (self.key_fn)(key);

        {
            let entries = self.entries.read().await;
            match entries.get(&mapped) {
                Some(item) if !item.is_expired() => {
                    self.stats.record_hit();
                    return Ok(item.data.clone());
                }
                Some(_) => {}
                None => {
                    self.stats.record_miss();
                    return Err(CacheError::CacheMiss(key.to_string()));
                }
            }
        }

        self.evict_expired(&mapped).await;
        self.stats.record_miss();
        Err(CacheError::CacheMiss(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let removed = self.entries.write().await.remove(&(self.key_fn)(key));
        match removed {
            Some(item) if !item.is_expired() => Ok(()),
            Some(_) => {
                self.stats.record_expirations(1);
                Err(CacheError::CacheMiss(key.to_string()))
            }
            None => Err(CacheError::CacheMiss(key.to_string())),
        }
    }

    async fn flush(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn has(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let mapped = (self.key_fn)(key);

        let expired = match self.entries.read().await.get(&mapped) {
            Some(item) => item.is_expired(),
            None => return false,
        };

        if expired {
            self.evict_expired(&mapped).await;
        }
        !expired
    }

    fn as_gc(&self) -> Option<&dyn GarbageCollector> {
        Some(self)
    }
}

#[async_trait]
impl GarbageCollector for MemoryStore {
    async fn gc(&self) -> Result<usize> {
        Ok(sweep(&self.entries, &self.stats).await)
    }
}
