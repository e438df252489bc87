//! onecache - A uniform cache store contract
//!
//! Provides one `Store` interface over in-memory, filesystem, Redis and
//! Memcached backends, with TTL expiration and a name-based adapter registry.

pub mod cache;
pub mod config;
pub mod error;
pub mod registry;
pub mod stores;
pub mod tasks;

pub use cache::{GarbageCollector, Item, Store, Ttl, EXPIRES_DEFAULT, EXPIRES_FOREVER};
pub use config::Config;
pub use error::{CacheError, Result};
pub use registry::Registry;
pub use stores::{FsStore, MemoryStore};
