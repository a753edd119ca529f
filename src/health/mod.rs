//! Dependency health aggregation.
//!
//! Every probe runs on its own task and is raced against a deadline, so a
//! hung or panicking dependency never keeps the others from reporting.

pub mod probes;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::HealthConfig;
use crate::error::AppError;
use crate::metrics::{MetricsStore, RequestStats};

pub use probes::{RedisProbe, TcpProbe, UnconfiguredProbe};

/// Outcome of one dependency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckStatus {
    Healthy { detail: String },
    Degraded { reason: String },
    Unhealthy { error: String },
    NotConfigured,
}

impl CheckStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::NotConfigured)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    #[serde(flatten)]
    pub status: CheckStatus,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub version: &'static str,
    pub checks: Vec<CheckResult>,
    pub metrics: RequestStats,
}

/// A single reachability check against an external dependency.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> CheckStatus;
}

pub struct HealthAggregator {
    probes: Vec<Arc<dyn HealthProbe>>,
    timeout: Duration,
    degraded_after: Duration,
    started: Instant,
}

impl HealthAggregator {
    pub fn new(timeout: Duration, degraded_after: Duration) -> Self {
        Self {
            probes: Vec::new(),
            timeout,
            degraded_after,
            started: Instant::now(),
        }
    }

    pub fn with_probe(mut self, probe: impl HealthProbe + 'static) -> Self {
        self.probes.push(Arc::new(probe));
        self
    }

    /// database, cache, payment and mail probes; absent addresses are
    /// reported as not configured.
    pub fn from_config(cfg: &HealthConfig) -> Result<Self, AppError> {
        let mut agg = Self::new(
            Duration::from_millis(cfg.probe_timeout_ms),
            Duration::from_millis(cfg.degraded_latency_ms),
        );

        agg = match &cfg.database_addr {
            Some(addr) => agg.with_probe(TcpProbe::new("database", addr)),
            None => agg.with_probe(UnconfiguredProbe::new("database")),
        };
        agg = match &cfg.redis_url {
            Some(url) => agg.with_probe(RedisProbe::new("cache", url)?),
            None => agg.with_probe(UnconfiguredProbe::new("cache")),
        };
        agg = match &cfg.payment_addr {
            Some(addr) => agg.with_probe(TcpProbe::new("payment", addr)),
            None => agg.with_probe(UnconfiguredProbe::new("payment")),
        };
        agg = match &cfg.mail_addr {
            Some(addr) => agg.with_probe(TcpProbe::new("mail", addr)),
            None => agg.with_probe(UnconfiguredProbe::new("mail")),
        };

        Ok(agg)
    }

    /// Run every probe concurrently and wait for all of them to settle.
    /// Results come back in registration order.
    pub async fn run(&self) -> Vec<CheckResult> {
        let handles: Vec<_> = self
            .probes
            .iter()
            .map(|probe| {
                let probe = probe.clone();
                let timeout = self.timeout;
                let degraded_after = self.degraded_after;
                tokio::spawn(async move { run_one(probe, timeout, degraded_after).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (probe, handle) in self.probes.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(check = probe.name(), error = %e, "health check task failed");
                    CheckResult {
                        name: probe.name().to_owned(),
                        status: CheckStatus::Unhealthy {
                            error: "check panicked".into(),
                        },
                        latency_ms: 0,
                    }
                }
            };
            results.push(result);
        }
        results
    }

    pub async fn report(&self, metrics: &MetricsStore) -> HealthReport {
        let checks = self.run().await;
        HealthReport {
            status: classify(&checks),
            timestamp: Utc::now(),
            uptime_secs: self.started.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
            checks,
            metrics: metrics.request_stats(None, None),
        }
    }
}

async fn run_one(
    probe: Arc<dyn HealthProbe>,
    timeout: Duration,
    degraded_after: Duration,
) -> CheckResult {
    let start = Instant::now();
    let status = match tokio::time::timeout(timeout, probe.check()).await {
        Ok(status) => status,
        Err(_) => CheckStatus::Unhealthy {
            error: format!("timed out after {} ms", timeout.as_millis()),
        },
    };
    let elapsed = start.elapsed();
    let latency_ms = elapsed.as_millis() as u64;

    let status = match status {
        CheckStatus::Healthy { .. } if elapsed > degraded_after => CheckStatus::Degraded {
            reason: format!(
                "slow response: {latency_ms} ms exceeds {} ms",
                degraded_after.as_millis()
            ),
        },
        other => other,
    };

    match &status {
        CheckStatus::Unhealthy { error } => {
            warn!(check = probe.name(), latency_ms, %error, "dependency unhealthy")
        }
        CheckStatus::Degraded { reason } => {
            warn!(check = probe.name(), latency_ms, %reason, "dependency degraded")
        }
        _ => debug!(check = probe.name(), latency_ms, "dependency checked"),
    }

    CheckResult {
        name: probe.name().to_owned(),
        status,
        latency_ms,
    }
}

/// All configured checks healthy → healthy; at least 70% → degraded;
/// otherwise unhealthy. Unconfigured checks do not count either way.
pub fn classify(checks: &[CheckResult]) -> OverallStatus {
    let configured: Vec<_> = checks.iter().filter(|c| c.status.is_configured()).collect();
    if configured.is_empty() {
        return OverallStatus::Healthy;
    }

    let healthy = configured.iter().filter(|c| c.status.is_healthy()).count();
    let total = configured.len();
    if healthy == total {
        OverallStatus::Healthy
    } else if healthy * 10 >= total * 7 {
        OverallStatus::Degraded
    } else {
        OverallStatus::Unhealthy
    }
}
