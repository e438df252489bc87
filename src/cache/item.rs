//! Cache Item Module
//!
//! Defines the TTL-tagged envelope every store keeps, and the `Ttl` type
//! callers use to describe an entry's lifetime.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// == Ttl ==
/// Lifetime requested for a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Use the store's configured default TTL
    #[default]
    Default,
    /// Never expire
    Forever,
    /// Expire after the given duration; a zero duration behaves like `Default`
    After(Duration),
}

/// Sentinel asking the store for its default TTL.
pub const EXPIRES_DEFAULT: Ttl = Ttl::Default;

/// Sentinel for entries that never expire.
pub const EXPIRES_FOREVER: Ttl = Ttl::Forever;

/// Built-in default lifetime, also used when a store is configured with a
/// zero default.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

impl Ttl {
    /// Resolves the effective lifetime, `None` meaning "never expires".
    ///
    /// A zero `default_ttl` is replaced by `DEFAULT_TTL`, so the default is
    /// never a zero lifetime.
    pub fn resolve(self, default_ttl: Duration) -> Option<Duration> {
        let default_ttl = if default_ttl.is_zero() {
            DEFAULT_TTL
        } else {
            default_ttl
        };
        match self {
            Ttl::Default => Some(default_ttl),
            Ttl::Forever => None,
            Ttl::After(ttl) if ttl.is_zero() => Some(default_ttl),
            Ttl::After(ttl) => Some(ttl),
        }
    }
}

impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Self {
        Ttl::After(ttl)
    }
}

// == Item ==
/// A cached value together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Expiration instant, None = never expires
    pub expires_at: Option<DateTime<Utc>>,
    /// The stored payload
    pub data: Vec<u8>,
}

impl Item {
    // == Constructor ==
    /// Creates a new item expiring `ttl` from now.
    ///
    /// # Arguments
    /// * `data` - The payload, owned by the item from here on
    /// * `ttl` - Requested lifetime
    /// * `default_ttl` - Lifetime used when `ttl` asks for the default
    pub fn new(data: Vec<u8>, ttl: Ttl, default_ttl: Duration) -> Self {
        let expires_at = ttl.resolve(default_ttl).and_then(expiry_after);
        Self { expires_at, data }
    }

    // == Is Expired ==
    /// Checks if the item has expired.
    ///
    /// An item is expired once the current time is strictly after its
    /// expiration time. Items without an expiration never expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }

    /// Returns true if the item was created with `Ttl::Forever`.
    pub fn never_expires(&self) -> bool {
        self.expires_at.is_none()
    }
}

/// A lifetime too large to represent as a timestamp is treated as forever.
fn expiry_after(ttl: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
}
