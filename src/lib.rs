//! Sliding-window request metrics and dependency health for an HTTP service.

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod redis_client;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use config::MonitorConfig;
use error::AppError;
use health::HealthAggregator;
use metrics::{MetricsStore, ProcessMemorySampler, SystemClock};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: MonitorConfig,

    /// Central metrics store — the timing middleware records, handlers read.
    pub metrics: Arc<MetricsStore>,

    pub health: HealthAggregator,
}

impl AppState {
    /// Wall clock and this process's real memory usage.
    pub fn from_config(config: MonitorConfig) -> Result<Self, AppError> {
        let metrics = Arc::new(MetricsStore::new(
            config.metrics.limits(),
            config.budget,
            Arc::new(SystemClock),
            Arc::new(ProcessMemorySampler::new()),
        ));
        let health = HealthAggregator::from_config(&config.health)?;
        Ok(Self {
            config,
            metrics,
            health,
        })
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.config.metrics.snapshot_interval_ms)
    }
}
