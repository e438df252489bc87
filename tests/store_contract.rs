//! Integration Tests for the Store Contract
//!
//! Runs the same scenarios against every bundled backend resolved through the
//! registry, checking they behave identically at the contract boundary.

use std::sync::Arc;
use std::time::Duration;

use onecache::{CacheError, Config, Registry, Store, Ttl};
use tempfile::TempDir;

// == Helper Functions ==

/// Registry over a scratch directory, with the background sweep disabled.
fn test_registry(dir: &TempDir) -> Registry {
    let config = Config {
        base_dir: dir.path().join("cache"),
        gc_interval: 0,
        ..Config::default()
    };
    Registry::with_builtin(&config)
}

fn stores(dir: &TempDir) -> Vec<(&'static str, Arc<dyn Store>)> {
    let registry = test_registry(dir);
    ["memory", "filesystem"]
        .into_iter()
        .map(|name| (name, registry.resolve(name).unwrap()))
        .collect()
}

fn ms(millis: u64) -> Ttl {
    Ttl::After(Duration::from_millis(millis))
}

// == Contract Scenarios ==

#[tokio::test]
async fn test_set_get_expire() {
    let dir = TempDir::new().unwrap();
    for (name, store) in stores(&dir) {
        store.set("name", b"Lanre", ms(10)).await.unwrap();
        assert_eq!(store.get("name").await.unwrap(), b"Lanre", "{name}");

        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = store.get("name").await;
        assert!(matches!(result, Err(CacheError::CacheMiss(_))), "{name}: {result:?}");
    }
}

#[tokio::test]
async fn test_get_missing_key() {
    let dir = TempDir::new().unwrap();
    for (name, store) in stores(&dir) {
        let result = store.get("never-set").await;
        assert!(matches!(result, Err(CacheError::CacheMiss(_))), "{name}: {result:?}");
    }
}

#[tokio::test]
async fn test_delete_unknown_key() {
    let dir = TempDir::new().unwrap();
    for (name, store) in stores(&dir) {
        let result = store.delete("ghost").await;
        assert!(matches!(result, Err(CacheError::CacheMiss(_))), "{name}: {result:?}");
    }
}

#[tokio::test]
async fn test_copy_isolation() {
    let dir = TempDir::new().unwrap();
    for (name, store) in stores(&dir) {
        let mut data = b"abcdef".to_vec();
        store.set("key", &data, Ttl::Default).await.unwrap();
        data[0] = b'z';

        let mut val = store.get("key").await.unwrap();
        assert_eq!(val, b"abcdef", "{name}");
        val[0] = b'z';

        assert_eq!(store.get("key").await.unwrap(), b"abcdef", "{name}");
    }
}

#[tokio::test]
async fn test_idempotent_flush() {
    let dir = TempDir::new().unwrap();
    for (name, store) in stores(&dir) {
        store.set("a", b"1", Ttl::Default).await.unwrap();
        store.set("b", b"2", Ttl::Forever).await.unwrap();

        store.flush().await.unwrap();
        assert!(!store.has("a").await, "{name}");

        store.flush().await.unwrap();
        assert!(!store.has("b").await, "{name}");
    }
}

#[tokio::test]
async fn test_has_does_not_extend_ttl() {
    let dir = TempDir::new().unwrap();
    for (name, store) in stores(&dir) {
        store.set("k", b"v", ms(50)).await.unwrap();

        let start = tokio::time::Instant::now();
        while start.elapsed() < Duration::from_millis(40) {
            let _ = store.has("k").await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep_until(start + Duration::from_millis(60)).await;

        let result = store.get("k").await;
        assert!(matches!(result, Err(CacheError::CacheMiss(_))), "{name}: {result:?}");
    }
}

#[tokio::test]
async fn test_forever_outlives_default() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        base_dir: dir.path().join("cache"),
        gc_interval: 0,
        default_ttl: 1,
        ..Config::default()
    };
    let registry = Registry::with_builtin(&config);

    for name in ["memory", "filesystem"] {
        let store = registry.resolve(name).unwrap();
        store.set("default", b"v", Ttl::Default).await.unwrap();
        store.set("forever", b"v", Ttl::Forever).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(!store.has("default").await, "{name}");
        assert!(store.has("forever").await, "{name}");
    }
}

#[tokio::test]
async fn test_zero_default_ttl_falls_back() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        base_dir: dir.path().join("cache"),
        gc_interval: 0,
        default_ttl: 0,
        ..Config::default()
    };
    let registry = Registry::with_builtin(&config);

    for name in ["memory", "filesystem"] {
        let store = registry.resolve(name).unwrap();
        store.set("default", b"v", Ttl::Default).await.unwrap();
        store.set("zero", b"v", Ttl::After(Duration::ZERO)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(store.has("default").await, "{name}");
        assert!(store.has("zero").await, "{name}");
    }
}

#[tokio::test]
async fn test_gc_sweep() {
    let dir = TempDir::new().unwrap();
    for (name, store) in stores(&dir) {
        for key in ["name", "number", "x"] {
            store.set(key, b"v", Ttl::After(Duration::from_micros(1))).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(2)).await;

        let gc = store.as_gc().expect("store supports gc");
        assert_eq!(gc.gc().await.unwrap(), 3, "{name}");
        assert_eq!(gc.gc().await.unwrap(), 0, "{name}");
    }
}

#[tokio::test]
async fn test_filesystem_shares_directory_between_instances() {
    let dir = TempDir::new().unwrap();
    let registry = test_registry(&dir);

    let writer = registry.resolve("filesystem").unwrap();
    let reader = registry.resolve("filesystem").unwrap();

    writer.set("shared", b"v", Ttl::Default).await.unwrap();
    assert_eq!(reader.get("shared").await.unwrap(), b"v");
}

#[tokio::test]
async fn test_unregistered_adapter() {
    let dir = TempDir::new().unwrap();
    let result = test_registry(&dir).resolve("dynamodb");
    assert!(matches!(result, Err(CacheError::AdapterNotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_set_visible_across_tasks() {
    let dir = TempDir::new().unwrap();
    for (name, store) in stores(&dir) {
        let writer = store.clone();
        tokio::spawn(async move { writer.set("k", b"from-task", Ttl::Default).await })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), b"from-task", "{name}");
    }
}
