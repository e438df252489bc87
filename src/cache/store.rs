//! Store Contract
//!
//! The interface every backend implements, plus the key mapping shared by
//! all of them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::Ttl;
use crate::error::Result;

// == Store ==
/// Uniform cache contract.
///
/// Absent and expired keys are reported as `CacheError::CacheMiss` by every
/// implementation.
#[async_trait]
pub trait Store: Send + Sync {
    /// Stores `data` under `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, data: &[u8], ttl: Ttl) -> Result<()>;

    /// Returns a copy of the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Removes the value stored under `key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes every value this store manages.
    async fn flush(&self) -> Result<()>;

    /// Returns true if an unexpired value exists under `key`.
    ///
    /// Never errors and never extends the value's lifetime.
    async fn has(&self, key: &str) -> bool;

    /// Returns the sweep capability for stores without native expiry.
    fn as_gc(&self) -> Option<&dyn GarbageCollector> {
        None
    }
}

// == Garbage Collector ==
/// Proactive removal of expired entries.
#[async_trait]
pub trait GarbageCollector: Store {
    /// Removes all expired entries and returns how many were removed.
    async fn gc(&self) -> Result<usize>;
}

// == Key Functions ==
/// Maps a caller key to the key a store uses internally.
pub type KeyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Prefix applied by `default_key_fn`.
pub const DEFAULT_KEY_PREFIX: &str = "onecache:";

/// Builds a key function prepending `prefix`.
pub fn prefixed(prefix: impl Into<String>) -> KeyFn {
    let prefix = prefix.into();
    Arc::new(move |key| format!("{prefix}{key}"))
}

/// Key function prepending `DEFAULT_KEY_PREFIX`.
pub fn default_key_fn() -> KeyFn {
    prefixed(DEFAULT_KEY_PREFIX)
}
