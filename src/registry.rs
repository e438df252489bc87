//! Adapter Registry
//!
//! Maps backend names to constructors so callers can resolve a `Store` at
//! runtime without naming concrete backend types.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::cache::Store;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::stores::{FsOptions, FsStore, MemoryOptions, MemoryStore};

/// Builds a store instance.
pub type AdapterFn = Arc<dyn Fn() -> Result<Arc<dyn Store>> + Send + Sync>;

// == Registry ==
/// Name to constructor mapping.
///
/// Cloning yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct Registry {
    adapters: Arc<RwLock<HashMap<String, AdapterFn>>>,
}

impl Registry {
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // == Builtin Adapters ==
    /// Creates a registry with the bundled backends registered.
    ///
    /// # Adapters
    /// - `memory` - `MemoryStore` built from `config`
    /// - `filesystem` - `FsStore` under `config.base_dir`
    /// - `redis` - `RedisStore` for `config.redis_url` (feature `redis`)
    /// - `memcached` - `MemcachedStore` for `config.memcached_url` (feature `memcached`)
    pub fn with_builtin(config: &Config) -> Self {
        let registry = Self::new();

        let memory = MemoryOptions::from_config(config);
        registry.register("memory", move || {
            Ok(Arc::new(MemoryStore::with_options(memory.clone())) as Arc<dyn Store>)
        });

        let filesystem = FsOptions::from_config(config);
        registry.register("filesystem", move || {
            Ok(Arc::new(FsStore::open(filesystem.clone())?) as Arc<dyn Store>)
        });

        #[cfg(feature = "redis")]
        {
            let config = config.clone();
            registry.register("redis", move || {
                Ok(Arc::new(crate::stores::RedisStore::from_config(&config)?) as Arc<dyn Store>)
            });
        }

        #[cfg(feature = "memcached")]
        {
            let config = config.clone();
            registry.register("memcached", move || {
                Ok(Arc::new(crate::stores::MemcachedStore::from_config(&config)?) as Arc<dyn Store>)
            });
        }

        registry
    }

    // == Register ==
    /// Registers `constructor` under `name`, replacing any previous one.
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Result<Arc<dyn Store>> + Send + Sync + 'static,
    {
        let name = name.into();
        let replaced = self
            .adapters
            .write()
            .insert(name.clone(), Arc::new(constructor))
            .is_some();

        if replaced {
            info!("Adapter {} re-registered, previous constructor replaced", name);
        } else {
            debug!("Adapter {} registered", name);
        }
    }

    // == Resolve ==
    /// Builds a new store from the constructor registered under `name`.
    ///
    /// Every call invokes the constructor; instances are not cached.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Store>> {
        // Release the lock before running the constructor, which may itself
        // use the registry.
        let constructor = self
            .adapters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::AdapterNotFound(name.to_string()))?;

        debug!("Resolving adapter {}", name);
        constructor()
    }

    // == Contains ==
    /// Returns true if an adapter is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.adapters.read().contains_key(name)
    }

    // == Names ==
    /// Registered adapter names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.read().keys().cloned().collect();
        names.sort();
        names
    }
}
