//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries from one cache,
//! so keys that are written and never read again do not hold memory until
//! they are evicted.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::BoundedCache;

// == Sweep Handle ==
/// Control handle for a running sweep task.
///
/// Dropping the handle also ends the task.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Asks the task to exit. A pass already in progress completes first.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns a background task that periodically purges expired entries of `cache`.
///
/// The task wakes every `sweep_interval`, or early when the cache signals
/// memory pressure. It holds only a weak reference, so it also exits once the
/// cache is dropped.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(BoundedCache::<String>::new(CacheConfig::default()));
/// let mut handle = spawn_sweep_task(&cache);
/// // Later, during shutdown:
/// handle.stop();
/// ```
pub fn spawn_sweep_task<V>(cache: &Arc<BoundedCache<V>>) -> SweepHandle
where
    V: Send + Sync + 'static,
{
    let interval = cache.sweep_interval();
    let pressure = cache.pressure_signal();
    let cache = Arc::downgrade(cache);
    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        info!("Starting cache sweep task with interval of {:?}", interval);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = tokio::time::sleep(interval) => {}
                _ = pressure.notified() => {
                    debug!("Memory pressure reported, sweeping early");
                }
            }

            let Some(cache) = cache.upgrade() else {
                break;
            };
            let removed = cache.purge_expired();
            drop(cache);

            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }

        debug!("Cache sweep task exited");
    });

    SweepHandle {
        shutdown: Some(shutdown),
        task,
    }
}
