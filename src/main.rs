//! onecache demo
//!
//! Resolves the configured store through the adapter registry and walks
//! through the basic operations, logging each result.

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onecache::cache::{increment, JsonSerializer};
use onecache::{Config, Registry, Ttl};

/// Entry point.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the registry and resolve `ONECACHE_STORE`
/// 4. Run set/get/has/increment/flush against the store
/// 5. Sweep expired entries if the store supports it
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onecache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: store={}, default_ttl={}s, gc_interval={}s",
        config.store, config.default_ttl, config.gc_interval
    );

    let registry = Registry::with_builtin(&config);
    info!("Registered adapters: {:?}", registry.names());

    let store = registry
        .resolve(&config.store)
        .with_context(|| format!("resolving store {}", config.store))?;

    store.set("name", b"Lanre", Ttl::After(Duration::from_secs(600))).await?;
    let name = store.get("name").await?;
    info!("get(name) = {}", String::from_utf8_lossy(&name));

    let profile = JsonSerializer::encode(&["Lanre", "Rob Pike"])?;
    store.set("profile", &profile, Ttl::Default).await?;
    let names: Vec<String> = JsonSerializer::decode(&store.get("profile").await?)?;
    info!("get(profile) = {:?}", names);

    store.set("occupation", b"What ?", Ttl::After(Duration::from_millis(50))).await?;
    info!("has(occupation) = {}", store.has("occupation").await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("has(occupation) after expiry = {}", store.has("occupation").await);

    let visits = increment(store.as_ref(), "visits", 1, Ttl::Forever).await?;
    info!("increment(visits) = {}", visits);

    match store.get("unknown").await {
        Err(e) if e.is_miss() => info!("get(unknown) missed as expected"),
        other => warn!("get(unknown) returned {:?}", other),
    }

    if let Some(gc) = store.as_gc() {
        let removed = gc.gc().await?;
        info!("gc removed {} expired entries", removed);
    }

    store.flush().await?;
    info!("Store flushed");

    Ok(())
}
