use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::ResultCache;

/// Entry count above which the sweeper also drops entries older than `AGGRESSIVE_MAX_AGE`
pub const AGGRESSIVE_SWEEP_THRESHOLD: usize = 100;

/// Max age applied during an aggressive sweep (6 hours)
pub const AGGRESSIVE_MAX_AGE: Duration = Duration::from_secs(6 * 60 * 60);

const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Handle for gracefully shutting down the cache sweeper
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for the task to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache sweeper task failed");
        }
        tracing::info!("Cache sweeper stopped");
    }
}

/// Spawns a background task that sweeps expired entries every `period`
pub fn spawn_sweeper(cache: ResultCache, period: Duration) -> SweeperHandle {
    // interval panics on a zero period
    let period = period.max(MIN_SWEEP_PERIOD);
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let task = tokio::spawn(sweeper_task(cache, period, shutdown_rx));
    SweeperHandle { shutdown_tx, task }
}

async fn sweeper_task(cache: ResultCache, period: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
    tracing::info!(period_secs = period.as_secs(), "Cache sweeper started");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_sweep(&cache).await;
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }
}

/// One sweep pass: expired entries, plus old entries when the cache was large going in
pub async fn run_sweep(cache: &ResultCache) -> usize {
    let total = cache.len().await;
    let mut removed = cache.sweep().await;

    if total > AGGRESSIVE_SWEEP_THRESHOLD {
        tracing::warn!(
            total,
            threshold = AGGRESSIVE_SWEEP_THRESHOLD,
            "Cache above size threshold, sweeping aggressively"
        );
        removed += cache.sweep_older_than(AGGRESSIVE_MAX_AGE).await;
    }

    removed
}
