use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::alerts::{derive_alerts, validate_budget, Alert, BudgetReport, PerformanceBudget};
use super::clock::Clock;
use super::percentiles::RequestStats;
use super::route_key::normalize_key;
use super::system::MemorySampler;
use super::{ErrorSample, RequestSample, SystemSample};

// ─── Configuration ───────────────────────────────────────────────

/// Retention limits for the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    /// Trailing window for retention and aggregation
    pub window_ms: u64,
    /// Max samples kept per route key and per status code
    pub sample_cap: usize,
    /// Max system snapshots kept
    pub system_sample_cap: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            window_ms: 300_000,
            sample_cap: 10_000,
            system_sample_cap: 1_000,
        }
    }
}

// ─── Public types ────────────────────────────────────────────────

/// Sliding-window metrics store.
/// The timing middleware calls `record_*()`, handlers call the `*_stats()` readers.
pub struct MetricsStore {
    inner: Mutex<Inner>,
    limits: StoreLimits,
    budget: PerformanceBudget,
    clock: Arc<dyn Clock>,
    memory: Arc<dyn MemorySampler>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    pub total_errors: u64,
    pub error_breakdown: BTreeMap<u16, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub avg_memory_usage: u64,
    pub peak_memory_usage: u64,
    /// Always a live reading, never taken from history
    pub current_memory_usage: u64,
}

/// One row of the per-route breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStats {
    pub route: String,
    pub count: u64,
    pub avg_response_time: u64,
    pub error_rate: f64,
    pub p95: f64,
}

/// Complete snapshot shipped to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub timestamp: DateTime<Utc>,
    pub requests: RequestStats,
    pub errors: ErrorStats,
    pub system: SystemStats,
    pub routes: Vec<RouteStats>,
    pub alerts: Vec<Alert>,
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    requests: HashMap<String, VecDeque<RequestSample>>,
    errors: HashMap<u16, VecDeque<ErrorSample>>,
    system: VecDeque<SystemSample>,
    /// Clock reading of the last full sweep over every key
    last_sweep_ms: Option<i64>,
}

/// Memory history inside a window: (sum, count, peak).
type MemoryHistory = (u64, u64, u64);

// ─── MetricsStore impl ───────────────────────────────────────────

impl MetricsStore {
    pub fn new(
        limits: StoreLimits,
        budget: PerformanceBudget,
        clock: Arc<dyn Clock>,
        memory: Arc<dyn MemorySampler>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            limits,
            budget,
            clock,
            memory,
        }
    }

    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    pub fn budget(&self) -> PerformanceBudget {
        self.budget
    }

    /// Current time according to the store's clock.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // ── Write side ──────────────────────────────────────────────

    /// Append, evict anything outside the window, trim to the cap.
    /// At most once per window, also sweeps keys that stopped receiving traffic.
    pub fn record_request(&self, sample: RequestSample) {
        let now = self.clock.now_ms();
        let cutoff = cutoff_at(now, self.limits.window_ms);
        let mut inner = self.inner.lock();
        let list = inner.requests.entry(sample.route.clone()).or_default();
        list.push_back(sample);
        evict(list, cutoff, self.limits.sample_cap, |s| s.timestamp_ms);
        inner.sweep_if_due(now, cutoff, self.limits.window_ms);
    }

    /// Same contract as `record_request`, bucketed by status code.
    pub fn record_error(&self, sample: ErrorSample) {
        let now = self.clock.now_ms();
        let cutoff = cutoff_at(now, self.limits.window_ms);
        let mut inner = self.inner.lock();
        let list = inner.errors.entry(sample.status).or_default();
        list.push_back(sample);
        evict(list, cutoff, self.limits.sample_cap, |s| s.timestamp_ms);
        inner.sweep_if_due(now, cutoff, self.limits.window_ms);
    }

    /// Runs on the snapshot tick, so it always sweeps every key as well.
    pub fn record_system_snapshot(&self, sample: SystemSample) {
        let now = self.clock.now_ms();
        let cutoff = cutoff_at(now, self.limits.window_ms);
        let mut inner = self.inner.lock();
        inner.system.push_back(sample);
        evict(
            &mut inner.system,
            cutoff,
            self.limits.system_sample_cap,
            |s| s.timestamp_ms,
        );
        inner.sweep(now, cutoff);
    }

    /// Take a live memory reading stamped with the store's clock.
    pub fn sample_system(&self) -> SystemSample {
        SystemSample {
            timestamp_ms: self.clock.now_ms(),
            memory_mb: self.memory.resident_mb(),
        }
    }

    #[cfg(test)]
    pub(crate) fn reset(&self) {
        *self.inner.lock() = Inner::default();
    }

    // ── Read side ───────────────────────────────────────────────

    /// Stats for one route, or across every route when `route` is `None`.
    /// `route` may be a raw `METHOD:/path`; it is normalized like recorded
    /// samples are. An unknown route yields zeroed stats.
    pub fn request_stats(&self, route: Option<&str>, window_ms: Option<u64>) -> RequestStats {
        let window_ms = window_ms.unwrap_or(self.limits.window_ms);
        let cutoff = cutoff_at(self.clock.now_ms(), window_ms);
        let route = route.map(normalize_key);
        self.inner
            .lock()
            .request_stats(route.as_deref(), cutoff, window_ms)
    }

    pub fn error_stats(&self, window_ms: Option<u64>) -> ErrorStats {
        let window_ms = window_ms.unwrap_or(self.limits.window_ms);
        let cutoff = cutoff_at(self.clock.now_ms(), window_ms);
        self.inner.lock().error_stats(cutoff)
    }

    pub fn system_stats(&self, window_ms: Option<u64>) -> SystemStats {
        let window_ms = window_ms.unwrap_or(self.limits.window_ms);
        let cutoff = cutoff_at(self.clock.now_ms(), window_ms);
        let history = self.inner.lock().memory_history(cutoff);
        self.system_stats_from(history)
    }

    /// Per-route rows over the configured window, busiest first.
    /// Routes with no samples in the window are left out.
    pub fn route_breakdown(&self) -> Vec<RouteStats> {
        let window_ms = self.limits.window_ms;
        let cutoff = cutoff_at(self.clock.now_ms(), window_ms);
        self.inner.lock().route_breakdown(cutoff, window_ms)
    }

    /// One clock reading and one lock acquisition for every section, so
    /// `requests.count` always equals the sum of the route rows.
    pub fn dashboard(&self) -> DashboardMetrics {
        let now = self.clock.now_ms();
        let window_ms = self.limits.window_ms;
        let cutoff = cutoff_at(now, window_ms);

        let (requests, errors, history, routes) = {
            let inner = self.inner.lock();
            (
                inner.request_stats(None, cutoff, window_ms),
                inner.error_stats(cutoff),
                inner.memory_history(cutoff),
                inner.route_breakdown(cutoff, window_ms),
            )
        };

        let system = self.system_stats_from(history);
        let alerts = derive_alerts(&requests, &system, &self.budget);

        DashboardMetrics {
            timestamp: Utc
                .timestamp_millis_opt(now)
                .single()
                .unwrap_or_else(Utc::now),
            requests,
            errors,
            system,
            routes,
            alerts,
        }
    }

    pub fn validate_budget(&self) -> BudgetReport {
        let window_ms = self.limits.window_ms;
        let cutoff = cutoff_at(self.clock.now_ms(), window_ms);
        let (requests, history) = {
            let inner = self.inner.lock();
            (
                inner.request_stats(None, cutoff, window_ms),
                inner.memory_history(cutoff),
            )
        };
        let system = self.system_stats_from(history);
        validate_budget(&requests, &system, &self.budget)
    }

    /// Live reading taken outside the lock.
    fn system_stats_from(&self, (sum, count, peak): MemoryHistory) -> SystemStats {
        let current = self.memory.resident_mb();
        if count == 0 {
            return SystemStats {
                current_memory_usage: current,
                ..SystemStats::default()
            };
        }

        SystemStats {
            avg_memory_usage: (sum as f64 / count as f64).round() as u64,
            peak_memory_usage: peak,
            current_memory_usage: current,
        }
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn request_stats(&self, route: Option<&str>, cutoff: i64, window_ms: u64) -> RequestStats {
        match route {
            Some(route) => match self.requests.get(route) {
                Some(list) => RequestStats::from_samples(
                    list.iter().filter(|s| s.timestamp_ms > cutoff),
                    window_ms,
                ),
                None => RequestStats::empty(),
            },
            None => RequestStats::from_samples(
                self.requests
                    .values()
                    .flatten()
                    .filter(|s| s.timestamp_ms > cutoff),
                window_ms,
            ),
        }
    }

    fn error_stats(&self, cutoff: i64) -> ErrorStats {
        let mut stats = ErrorStats::default();
        for (&status, list) in &self.errors {
            let recent = list.iter().filter(|s| s.timestamp_ms > cutoff).count() as u64;
            if recent > 0 {
                stats.error_breakdown.insert(status, recent);
                stats.total_errors += recent;
            }
        }
        stats
    }

    fn memory_history(&self, cutoff: i64) -> MemoryHistory {
        self.system
            .iter()
            .filter(|s| s.timestamp_ms > cutoff)
            .fold((0, 0, 0), |(sum, count, peak), s| {
                (sum + s.memory_mb, count + 1, peak.max(s.memory_mb))
            })
    }

    fn route_breakdown(&self, cutoff: i64, window_ms: u64) -> Vec<RouteStats> {
        let mut rows: Vec<RouteStats> = self
            .requests
            .iter()
            .filter_map(|(route, list)| {
                let stats = RequestStats::from_samples(
                    list.iter().filter(|s| s.timestamp_ms > cutoff),
                    window_ms,
                );
                stats.has_data().then(|| RouteStats {
                    route: route.clone(),
                    count: stats.count,
                    avg_response_time: stats.avg_response_time,
                    error_rate: stats.error_rate,
                    p95: stats.p95,
                })
            })
            .collect();

        // Ties broken by name so repeated reads order identically.
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.route.cmp(&b.route)));
        rows
    }

    fn sweep_if_due(&mut self, now: i64, cutoff: i64, window_ms: u64) {
        let due = match self.last_sweep_ms {
            Some(last) => now.saturating_sub(last) >= to_i64(window_ms),
            None => true,
        };
        if due {
            self.sweep(now, cutoff);
        }
    }

    /// Evict stale samples under every key and drop keys left empty.
    fn sweep(&mut self, now: i64, cutoff: i64) {
        self.requests.retain(|_, list| {
            list.retain(|s| s.timestamp_ms > cutoff);
            !list.is_empty()
        });
        self.errors.retain(|_, list| {
            list.retain(|s| s.timestamp_ms > cutoff);
            !list.is_empty()
        });
        self.last_sweep_ms = Some(now);
    }
}

/// Samples with a timestamp strictly greater than this are in the window.
fn cutoff_at(now: i64, window_ms: u64) -> i64 {
    now.saturating_sub(to_i64(window_ms))
}

fn to_i64(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Keep entries newer than `cutoff`, then drop the oldest beyond `cap`.
fn evict<T>(list: &mut VecDeque<T>, cutoff: i64, cap: usize, ts: impl Fn(&T) -> i64) {
    list.retain(|s| ts(s) > cutoff);
    if list.len() > cap {
        let excess = list.len() - cap;
        list.drain(..excess);
    }
}
