//! Store Backends
//!
//! Implementations of the `Store` contract.

mod filesystem;
#[cfg(feature = "memcached")]
mod memcached;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use filesystem::{FsOptions, FsStore};
#[cfg(feature = "memcached")]
pub use memcached::MemcachedStore;
pub use memory::{MemoryOptions, MemoryStore};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
