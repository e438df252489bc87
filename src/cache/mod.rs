//! Cache Module
//!
//! The item envelope, its serializers, and the store contract shared by
//! every backend.

mod counter;
mod item;
mod serializer;
mod stats;
mod store;


// Re-export public types
pub use counter::{decrement, increment};
pub use item::{Item, Ttl, DEFAULT_TTL, EXPIRES_DEFAULT, EXPIRES_FOREVER};
pub use serializer::{BincodeSerializer, JsonSerializer, Serializer};
pub use stats::CacheStats;
pub(crate) use stats::StatsRecorder;
pub use store::{default_key_fn, prefixed, GarbageCollector, KeyFn, Store, DEFAULT_KEY_PREFIX};
