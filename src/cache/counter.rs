//! Counter Helpers
//!
//! Numeric increment and decrement layered over any store. Values are kept
//! as ASCII decimal integers; a missing key counts as zero.
//!
//! The read-modify-write is not atomic across concurrent callers.

use crate::cache::{Store, Ttl};
use crate::error::{CacheError, Result};

/// Adds `delta` to the integer stored under `key` and returns the new value.
///
/// The stored value's lifetime is replaced by `ttl`.
pub async fn increment<S>(store: &S, key: &str, delta: i64, ttl: Ttl) -> Result<i64>
where
    S: Store + ?Sized,
{
    let current = match store.get(key).await {
        Ok(bytes) => parse_counter(key, &bytes)?,
        Err(CacheError::CacheMiss(_)) => 0,
        Err(e) => return Err(e),
    };

    let next = current.checked_add(delta).ok_or_else(|| {
        CacheError::UnsupportedOperation(format!("counter {key} would overflow"))
    })?;

    store.set(key, next.to_string().as_bytes(), ttl).await?;
    Ok(next)
}

/// Subtracts `delta` from the integer stored under `key`.
pub async fn decrement<S>(store: &S, key: &str, delta: i64, ttl: Ttl) -> Result<i64>
where
    S: Store + ?Sized,
{
    let delta = delta.checked_neg().ok_or_else(|| {
        CacheError::UnsupportedOperation(format!("counter {key} would overflow"))
    })?;
    increment(store, key, delta, ttl).await
}

fn parse_counter(key: &str, bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| {
            CacheError::UnsupportedOperation(format!(
                "value under {key} is not an integer and cannot be increased or decreased"
            ))
        })
}
