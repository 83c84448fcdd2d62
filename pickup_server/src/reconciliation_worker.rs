use std::time::Duration;

use log::*;
use pickup_engine::{BoundedCartCache, CartReconciler, MemoryCartCache, SqliteDatabase};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

pub type ServerCartCache = BoundedCartCache<MemoryCartCache>;
pub type ServerReconciler = CartReconciler<ServerCartCache, SqliteDatabase, SqliteDatabase>;

/// Runs a reconciliation pass every `interval` until it is stopped.
///
/// Passes never overlap. A pass that is in flight when [`ReconciliationWorker::stop`] is called runs to completion
/// before the worker exits.
pub struct ReconciliationWorker {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReconciliationWorker {
    pub fn start(reconciler: ServerReconciler, interval: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("🕰️ Cart reconciliation worker started. Running every {}s", interval.as_secs_f64());
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = timer.tick() => {
                        trace!("🕰️ Running cart reconciliation pass");
                        if let Err(e) = reconciler.run_once().await {
                            error!("🕰️ Cart reconciliation pass failed. Will try again next time. {e}");
                        }
                    },
                }
            }
            info!("🕰️ Cart reconciliation worker stopped");
        });
        Self { stop, handle }
    }

    /// Signals the worker to stop and waits for it to exit.
    pub async fn stop(self) {
        // The receiver is gone if the task has already ended
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            error!("🕰️ Cart reconciliation worker did not shut down cleanly. {e}");
        }
    }
}
