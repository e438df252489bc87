//! Error types for the cache stores
//!
//! Every backend reports failures through `CacheError`, so callers never
//! handle backend-specific error values.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type shared by every store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is absent or has expired
    #[error("Key not found: {0}")]
    CacheMiss(String),

    /// The underlying medium rejected a write
    #[error("Data not stored: {0}")]
    NotStored(String),

    /// An item or payload could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Stored bytes could not be decoded
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// No adapter registered under the requested name
    #[error("Adapter not found: {0}")]
    AdapterNotFound(String),

    /// The operation is not supported for this store or payload
    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    /// Keys must be non-empty
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl CacheError {
    /// Returns true for a cache miss, whatever the backend.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::CacheMiss(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Rejects empty keys before they reach a backend.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}
