//! Filesystem Store
//!
//! Keeps one file per key under a base directory. File names are the SHA-256
//! digest of the mapped key; contents are the serialized item.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::cache::{
    default_key_fn, GarbageCollector, Item, JsonSerializer, KeyFn, Serializer, Store, Ttl,
    DEFAULT_TTL,
};
use crate::config::Config;
use crate::error::{validate_key, CacheError, Result};
use crate::tasks::{spawn_gc_task, GcHandle};

const TMP_SUFFIX: &str = "tmp";
const EVICT_SUFFIX: &str = "evict";

/// Distinguishes temp and tombstone files of concurrent callers.
static SIBLING_COUNTER: AtomicU64 = AtomicU64::new(0);

// == Options ==
/// Construction options for `FsStore`.
#[derive(Clone)]
pub struct FsOptions {
    /// Directory holding the cache files, created if missing
    pub base_dir: PathBuf,
    /// Lifetime of entries set with `Ttl::Default`
    pub default_ttl: Duration,
    /// Interval of the background sweep, None = no sweep
    pub gc_interval: Option<Duration>,
    /// Item encoding used for every file of this store
    pub serializer: Arc<dyn Serializer>,
    /// Caller key to file key
    pub key_fn: KeyFn,
}

impl FsOptions {
    // == Constructor ==
    /// Options for `base_dir` with JSON encoding and no sweep.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            default_ttl: DEFAULT_TTL,
            gc_interval: None,
            serializer: Arc::new(JsonSerializer),
            key_fn: default_key_fn(),
        }
    }

    // == From Config ==
    /// Builds options from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_ttl: config.default_ttl(),
            gc_interval: config.gc_interval(),
            key_fn: crate::cache::prefixed(config.key_prefix.clone()),
            ..Self::new(config.base_dir.clone())
        }
    }

    /// Sets the default TTL. A zero TTL keeps `DEFAULT_TTL`.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = if ttl.is_zero() { DEFAULT_TTL } else { ttl };
        self
    }

    /// Sets the item serializer.
    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Sets the background sweep interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = Some(interval);
        self
    }
}

// == Filesystem Store ==
/// Store persisting items as files.
pub struct FsStore {
    base_dir: PathBuf,
    default_ttl: Duration,
    serializer: Arc<dyn Serializer>,
    key_fn: KeyFn,
    gc_task: Option<GcHandle>,
}

impl FsStore {
    // == Open ==
    /// Opens the store, creating the base directory if it does not exist.
    pub fn open(options: FsOptions) -> Result<Self> {
        std::fs::create_dir_all(&options.base_dir)?;

        let gc_task = options.gc_interval.and_then(|interval| {
            let base_dir = options.base_dir.clone();
            let serializer = options.serializer.clone();
            spawn_gc_task("filesystem", interval, move || {
                let base_dir = base_dir.clone();
                let serializer = serializer.clone();
                async move { sweep_dir(&base_dir, serializer.as_ref()).await }
            })
        });

        Ok(Self {
            base_dir: options.base_dir,
            default_ttl: options.default_ttl,
            serializer: options.serializer,
            key_fn: options.key_fn,
            gc_task,
        })
    }

    // == Base Dir ==
    /// Directory holding the cache files.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // == GC Running ==
    /// Returns true while the background sweep is running.
    pub fn gc_running(&self) -> bool {
        self.gc_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    // == Path For ==
    /// Path of the file holding `key`.
    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest((self.key_fn)(key).as_bytes());
        self.base_dir.join(hex::encode(digest))
    }
}

/// Removes a file, treating an already missing file as success.
async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// A uniquely named sibling of `path`, e.g. `<digest>.7.tmp`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    path.with_extension(format!(
        "{}.{}",
        SIBLING_COUNTER.fetch_add(1, Ordering::Relaxed),
        suffix
    ))
}

/// True for cache files, whose names are bare hex digests.
fn is_cache_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.len() == 64 && name.bytes().all(|b| b.is_ascii_hexdigit()))
}

// == Evict If Expired ==
/// Removes the cache file at `path` if it still holds an expired item,
/// returning true if it did.
///
/// The file is first renamed to a private tombstone, so the content checked is
/// exactly the content removed. A tombstone that turns out to be live (a
/// concurrent `set` landed before the rename) is linked back into place,
/// unless an even newer write already took it.
async fn evict_if_expired(path: &Path, serializer: &dyn Serializer) -> Result<bool> {
    let tombstone = sibling(path, EVICT_SUFFIX);
    match fs::rename(path, &tombstone).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    }

    let expired = match fs::read(&tombstone).await {
        Ok(bytes) => serializer
            .deserialize(&bytes)
            .is_ok_and(|item| item.is_expired()),
        Err(e) => {
            fs::rename(&tombstone, path).await?;
            return Err(e.into());
        }
    };

    if !expired {
        match fs::hard_link(&tombstone, path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(_) => {
                fs::rename(&tombstone, path).await?;
                return Ok(false);
            }
        }
    }

    remove_if_present(&tombstone).await?;
    Ok(expired)
}

// == Sweep Dir ==
/// Removes every expired cache file under `base_dir`.
///
/// Files that fail to decode are left in place and logged.
async fn sweep_dir(base_dir: &Path, serializer: &dyn Serializer) -> Result<usize> {
    let mut removed = 0;
    let mut dir = fs::read_dir(base_dir).await?;

    while let Some(entry) = dir.next_entry().await? {
        let path = entry.path();
        if !is_cache_file(&path) || !entry.file_type().await?.is_file() {
            continue;
        }

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            // Deleted concurrently
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        match serializer.deserialize(&bytes) {
            Ok(item) if item.is_expired() => {
                if evict_if_expired(&path, serializer).await? {
                    removed += 1;
                }
            }
            Ok(_) => {}
            Err(e) => warn!("filesystem store: skipping unreadable file {:?}: {}", path, e),
        }
    }

    Ok(removed)
}

#[async_trait]
impl Store for FsStore {
    async fn set(&self, key: &str, data: &[u8], ttl: Ttl) -> Result<()> {
        validate_key(key)?;
        let item = Item::new(data.to_vec(), ttl, self.default_ttl);
        let bytes = self.serializer.serialize(&item)?;

        let path = self.path_for(key);
        let tmp = sibling(&path, TMP_SUFFIX);

        // Readers only ever see complete files
        if let Err(e) = fs::write(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::NotStored(format!("{key}: {e}")));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::NotStored(format!("{key}: {e}")));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let path = self.path_for(key);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CacheError::CacheMiss(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let item = self.serializer.deserialize(&bytes)?;
        if item.is_expired() {
            if evict_if_expired(&path, self.serializer.as_ref()).await? {
                debug!("filesystem store: evicted expired key {}", key);
            }
            return Err(CacheError::CacheMiss(key.to_string()));
        }

        Ok(item.data)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::CacheMiss(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn flush(&self) -> Result<()> {
        match fs::remove_dir_all(&self.base_dir).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }

    async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_ok()
    }

    fn as_gc(&self) -> Option<&dyn GarbageCollector> {
        Some(self)
    }
}

#[async_trait]
impl GarbageCollector for FsStore {
    async fn gc(&self) -> Result<usize> {
        sweep_dir(&self.base_dir, self.serializer.as_ref()).await
    }
}
