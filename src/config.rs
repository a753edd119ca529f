use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AppError;
use crate::metrics::{PerformanceBudget, StoreLimits};

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub budget: PerformanceBudget,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

/// Retention and sampling for the metrics store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
    #[serde(default = "default_system_sample_cap")]
    pub system_sample_cap: usize,
    /// Period between automatic memory snapshots
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    /// Period between SSE dashboard pushes
    #[serde(default = "default_stream_interval_ms")]
    pub stream_interval_ms: u64,
}

/// Dependency probes. An absent address means "not configured".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Round-trips slower than this report as degraded
    #[serde(default = "default_degraded_latency_ms")]
    pub degraded_latency_ms: u64,
    pub redis_url: Option<String>,
    pub database_addr: Option<String>,
    pub mail_addr: Option<String>,
    pub payment_addr: Option<String>,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_addr() -> String { "0.0.0.0:3000".into() }
fn default_window_ms() -> u64 { 300_000 }
fn default_sample_cap() -> usize { 10_000 }
fn default_system_sample_cap() -> usize { 1_000 }
fn default_snapshot_interval_ms() -> u64 { 30_000 }
fn default_stream_interval_ms() -> u64 { 5_000 }
fn default_probe_timeout_ms() -> u64 { 5_000 }
fn default_degraded_latency_ms() -> u64 { 1_000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_addr() }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            sample_cap: default_sample_cap(),
            system_sample_cap: default_system_sample_cap(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            stream_interval_ms: default_stream_interval_ms(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            degraded_latency_ms: default_degraded_latency_ms(),
            redis_url: None,
            database_addr: None,
            mail_addr: None,
            payment_addr: None,
        }
    }
}

impl MetricsConfig {
    pub fn limits(&self) -> StoreLimits {
        StoreLimits {
            window_ms: self.window_ms,
            sample_cap: self.sample_cap,
            system_sample_cap: self.system_sample_cap,
        }
    }
}

// ── Loading ───────────────────────────────────────────────────

impl MonitorConfig {
    /// Defaults, then the TOML file (if present), then `PERF_*` env vars.
    /// Nested keys use `__`, e.g. `PERF_METRICS__WINDOW_MS=60000`.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        Self::from_figment(Self::figment(path))
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(MonitorConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PERF_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, AppError> {
        let config: MonitorConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let m = &self.metrics;
        let checks = [
            (m.window_ms == 0, "metrics.window_ms must be > 0"),
            (m.sample_cap == 0, "metrics.sample_cap must be > 0"),
            (m.system_sample_cap == 0, "metrics.system_sample_cap must be > 0"),
            (m.snapshot_interval_ms == 0, "metrics.snapshot_interval_ms must be > 0"),
            (m.stream_interval_ms == 0, "metrics.stream_interval_ms must be > 0"),
            (self.health.probe_timeout_ms == 0, "health.probe_timeout_ms must be > 0"),
            (
                self.budget.response_time_ms <= 0.0,
                "budget.response_time_ms must be > 0",
            ),
        ];
        match checks.iter().find(|(bad, _)| *bad) {
            Some((_, msg)) => Err(AppError::Config((*msg).into())),
            None => Ok(()),
        }
    }
}
