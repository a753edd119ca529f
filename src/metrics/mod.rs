pub mod alerts;
pub mod clock;
pub mod percentiles;
pub mod route_key;
pub mod snapshot;
pub mod store;
pub mod stream;
pub mod system;

pub use alerts::{Alert, AlertKind, AlertLevel, BudgetReport, PerformanceBudget};
pub use clock::{Clock, ManualClock, SystemClock};
pub use percentiles::RequestStats;
pub use store::{
    DashboardMetrics, ErrorStats, MetricsStore, RouteStats, StoreLimits, SystemStats,
};
pub use system::{FixedMemorySampler, MemorySampler, ProcessMemorySampler};

/// One completed HTTP request.
/// This is the "write" side — the timing middleware creates these and pushes them in.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSample {
    /// e.g. "GET:/courses/:id"
    pub route: String,
    pub status: u16,
    /// Wall time from request arrival to response, in milliseconds
    pub latency_ms: f64,
    /// Epoch milliseconds at completion
    pub timestamp_ms: i64,
    pub client_ip: String,
    pub user_agent: String,
}

/// One response with status ≥ 400, kept in its own per-status list.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSample {
    pub status: u16,
    pub route: String,
    pub timestamp_ms: i64,
    pub error: String,
    pub client_ip: String,
}

/// Periodic resource snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSample {
    pub timestamp_ms: i64,
    /// Resident set size in whole megabytes
    pub memory_mb: u64,
}

impl RequestSample {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// The matching error record, if this request failed.
    pub fn to_error_sample(&self, error: impl Into<String>) -> Option<ErrorSample> {
        if !self.is_error() {
            return None;
        }
        Some(ErrorSample {
            status: self.status,
            route: self.route.clone(),
            timestamp_ms: self.timestamp_ms,
            error: error.into(),
            client_ip: self.client_ip.clone(),
        })
    }
}
