//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries from a store
//! that has no native expiry.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Shortest sweep interval accepted; shorter ones would contend with
/// foreground operations for the store lock.
pub const MIN_GC_INTERVAL: Duration = Duration::from_secs(1);

/// Owns a running sweep task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct GcHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl GcHandle {
    /// Signals the task to stop and waits for it to finish.
    pub async fn shutdown(mut self) {
        self.signal_stop();
        let _ = (&mut self.handle).await;
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    fn signal_stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

/// Spawns a task calling `sweep` every `interval` until stopped.
///
/// Returns `None` without spawning when the interval is below
/// `MIN_GC_INTERVAL` or when called outside a tokio runtime.
///
/// # Arguments
/// * `name` - Store name used in log lines
/// * `interval` - Time between sweeps; the first sweep runs one interval in
/// * `sweep` - Removes expired entries and returns how many were removed
pub fn spawn_gc_task<F, Fut>(name: &'static str, interval: Duration, sweep: F) -> Option<GcHandle>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<usize>> + Send + 'static,
{
    if interval < MIN_GC_INTERVAL {
        warn!(
            "{} store: ignoring gc interval of {:?}, minimum is {:?}",
            name, interval, MIN_GC_INTERVAL
        );
        return None;
    }

    let Ok(runtime) = Handle::try_current() else {
        warn!("{} store: no tokio runtime, periodic gc disabled", name);
        return None;
    };

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let handle = runtime.spawn(async move {
        info!("{} store: starting gc task with interval of {:?}", name, interval);

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Fires on an explicit stop or when the handle is dropped
                _ = &mut stop_rx => {
                    debug!("{} store: gc task stopped", name);
                    break;
                }
                _ = ticker.tick() => {
                    match sweep().await {
                        Ok(0) => debug!("{} store gc: no expired entries found", name),
                        Ok(removed) => info!("{} store gc: removed {} expired entries", name, removed),
                        Err(e) => warn!("{} store gc failed: {}", name, e),
                    }
                }
            }
        }
    });

    Some(GcHandle {
        stop_tx: Some(stop_tx),
        handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_sweep(counter: Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<Result<usize>> {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(0))
        }
    }

    #[tokio::test]
    async fn test_gc_task_runs_periodically() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_gc_task("test", Duration::from_secs(1), counting_sweep(runs.clone()))
            .expect("interval is valid");

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(runs.load(Ordering::SeqCst) >= 2, "Sweep should have run twice");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_gc_task_rejects_short_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_gc_task("test", Duration::from_millis(10), counting_sweep(runs));
        assert!(handle.is_none());
    }

    #[test]
    fn test_gc_task_requires_runtime() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_gc_task("test", Duration::from_secs(1), counting_sweep(runs));
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_gc_task_can_be_shut_down() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_gc_task("test", Duration::from_secs(1), counting_sweep(runs.clone()))
            .expect("interval is valid");

        handle.shutdown().await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0, "Stopped task must not sweep");
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = spawn_gc_task("test", Duration::from_secs(1), counting_sweep(runs.clone()))
            .expect("interval is valid");

        drop(handle);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0, "Dropped task must not sweep");
    }
}
