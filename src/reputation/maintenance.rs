//! Periodic rescale driver.
//!
//! Runs [`ReputationManager::maybe_rescale`] on a fixed cadence between
//! batches of classifications. The check itself is synchronous and may take
//! O(n) when it rehashes or rebuilds, so it is sent to the blocking pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::reputation::manager::ReputationManager;

/// Handle to a running maintenance task.
#[derive(Debug)]
pub struct MaintenanceHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    ticks: Arc<AtomicU64>,
}

impl MaintenanceHandle {
    /// Completed rescale checks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Stop the task and wait for an in-flight check to finish.
    ///
    /// Returns the number of completed checks.
    pub async fn shutdown(self) -> u64 {
        // The receiver is gone only if the task already exited.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Maintenance task ended abnormally");
        }
        self.ticks.load(Ordering::Relaxed)
    }
}

/// Spawn the maintenance loop on the current tokio runtime.
///
/// The first check runs one `interval` after spawning.
pub fn spawn_maintenance(manager: Arc<ReputationManager>, interval: Duration) -> MaintenanceHandle {
    let (shutdown, mut stop) = oneshot::channel::<()>();
    let ticks = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&ticks);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately on the first tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut stop => {
                    debug!("Maintenance driver stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let manager = Arc::clone(&manager);
                    match tokio::task::spawn_blocking(move || manager.maybe_rescale()).await {
                        Ok(Ok(outcome)) if outcome.is_noop() => trace!("Periodic rescale check: no change"),
                        Ok(Ok(outcome)) => debug!(
                            rehashed = outcome.rehash.is_some(),
                            rebuilt = outcome.rebuild.is_some(),
                            "Periodic rescale applied"
                        ),
                        Ok(Err(e)) => warn!(error = %e, "Periodic rescale failed"),
                        Err(e) => warn!(error = %e, "Periodic rescale task did not complete"),
                    }
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    });

    MaintenanceHandle {
        shutdown,
        task,
        ticks,
    }
}
