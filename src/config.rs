//! Configuration Module
//!
//! Loads store configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cache::DEFAULT_TTL;

/// Store configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Adapter name resolved by the demo binary
    pub store: String,
    /// Default TTL in seconds for entries set with `Ttl::Default`
    pub default_ttl: u64,
    /// Background sweep interval in seconds, 0 disables the sweep
    pub gc_interval: u64,
    /// Initial capacity of the in-memory map
    pub capacity: usize,
    /// Base directory of the filesystem store
    pub base_dir: PathBuf,
    /// Prefix prepended to every caller key
    pub key_prefix: String,
    /// Connection URL of the Redis store
    pub redis_url: String,
    /// Server URL of the Memcached store
    pub memcached_url: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ONECACHE_STORE` - Adapter name (default: memory)
    /// - `ONECACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `ONECACHE_GC_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `ONECACHE_CAPACITY` - Initial map capacity (default: 1024)
    /// - `ONECACHE_DIR` - Filesystem store directory (default: <tmp>/onecache)
    /// - `ONECACHE_KEY_PREFIX` - Key prefix (default: onecache:)
    /// - `ONECACHE_REDIS_URL` - Redis URL (default: redis://127.0.0.1:6379/)
    /// - `ONECACHE_MEMCACHED_URL` - Memcached URL (default: memcache://127.0.0.1:11211)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store: env::var("ONECACHE_STORE").unwrap_or(defaults.store),
            default_ttl: parse_var("ONECACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            gc_interval: parse_var("ONECACHE_GC_INTERVAL").unwrap_or(defaults.gc_interval),
            capacity: parse_var("ONECACHE_CAPACITY").unwrap_or(defaults.capacity),
            base_dir: env::var("ONECACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.base_dir),
            key_prefix: env::var("ONECACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            redis_url: env::var("ONECACHE_REDIS_URL").unwrap_or(defaults.redis_url),
            memcached_url: env::var("ONECACHE_MEMCACHED_URL").unwrap_or(defaults.memcached_url),
        }
    }

    /// Default TTL as a duration, `DEFAULT_TTL` when set to 0.
    pub fn default_ttl(&self) -> Duration {
        if self.default_ttl == 0 {
            warn!("default TTL of 0s is not allowed, using {:?}", DEFAULT_TTL);
            return DEFAULT_TTL;
        }
        Duration::from_secs(self.default_ttl)
    }

    /// Sweep interval, `None` when the sweep is disabled.
    pub fn gc_interval(&self) -> Option<Duration> {
        (self.gc_interval > 0).then(|| Duration::from_secs(self.gc_interval))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: "memory".to_string(),
            default_ttl: 300,
            gc_interval: 60,
            capacity: 1024,
            base_dir: env::temp_dir().join("onecache"),
            key_prefix: "onecache:".to_string(),
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            memcached_url: "memcache://127.0.0.1:11211".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.store, "memory");
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.gc_interval, 60);
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.key_prefix, "onecache:");
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("ONECACHE_STORE");
        env::remove_var("ONECACHE_DEFAULT_TTL");
        env::remove_var("ONECACHE_GC_INTERVAL");
        env::remove_var("ONECACHE_CAPACITY");

        let config = Config::from_env();
        assert_eq!(config.store, "memory");
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.gc_interval, 60);
        assert_eq!(config.capacity, 1024);
    }

    #[test]
    fn test_durations() {
        let mut config = Config::default();
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
        assert_eq!(config.gc_interval(), Some(Duration::from_secs(60)));

        config.gc_interval = 0;
        assert_eq!(config.gc_interval(), None);
    }

    #[test]
    fn test_zero_default_ttl_uses_builtin() {
        let config = Config {
            default_ttl: 0,
            ..Config::default()
        };
        assert_eq!(config.default_ttl(), DEFAULT_TTL);
    }
}
