use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::MetricsStore;

/// Repeating task that feeds system snapshots into the store.
///
/// Owned by whoever started it. `stop()` ends it; dropping the handle
/// without stopping aborts the task as well.
pub struct SnapshotTask {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotTask {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<MetricsStore>, every: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = tokio::spawn(async move {
            let mut tick = interval(every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while flag.load(Ordering::Relaxed) {
                tick.tick().await;
                let sample = store.sample_system();
                debug!(memory_mb = sample.memory_mb, "system snapshot");
                store.record_system_snapshot(sample);
            }
        });

        let interval_ms = u64::try_from(every.as_millis()).unwrap_or(u64::MAX);
        info!(interval_ms, "system snapshot task started");

        Self {
            running,
            handle: Some(handle),
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop, abort any pending tick, and wait for the task to end.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Ignore JoinError — cancellation is the expected outcome
            let _ = handle.await;
        }
        info!("system snapshot task stopped");
    }
}

impl Drop for SnapshotTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::alerts::PerformanceBudget;
    use crate::metrics::clock::SystemClock;
    use crate::metrics::store::StoreLimits;
    use crate::metrics::system::FixedMemorySampler;

    fn store(mb: u64) -> Arc<MetricsStore> {
        Arc::new(MetricsStore::new(
            StoreLimits::default(),
            PerformanceBudget::default(),
            Arc::new(SystemClock),
            Arc::new(FixedMemorySampler::new(mb)),
        ))
    }

    #[tokio::test]
    async fn records_snapshots_until_stopped() {
        let store = store(200);
        let task = SnapshotTask::spawn(store.clone(), Duration::from_millis(10));
        assert!(task.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        task.stop().await;

        let stats = store.system_stats(None);
        assert_eq!(stats.peak_memory_usage, 200);
        assert_eq!(stats.avg_memory_usage, 200);
    }

    #[tokio::test]
    async fn nothing_recorded_after_stop() {
        let store = store(50);
        let task = SnapshotTask::spawn(store.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        task.stop().await;

        store.reset();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.system_stats(None).peak_memory_usage, 0);
    }
}
