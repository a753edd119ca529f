use serde::{Deserialize, Serialize};

use super::percentiles::RequestStats;
use super::store::SystemStats;

/// Thresholds that separate acceptable from violating behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBudget {
    #[serde(default = "default_response_time_ms")]
    pub response_time_ms: f64,
    #[serde(default = "default_error_rate_pct")]
    pub error_rate_pct: f64,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u64,
}

fn default_response_time_ms() -> f64 {
    1_000.0
}
fn default_error_rate_pct() -> f64 {
    5.0
}
fn default_memory_mb() -> u64 {
    512
}

impl Default for PerformanceBudget {
    fn default() -> Self {
        Self {
            response_time_ms: default_response_time_ms(),
            error_rate_pct: default_error_rate_pct(),
            memory_mb: default_memory_mb(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Performance,
    Error,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub level: AlertLevel,
    pub message: String,
    pub threshold: f64,
    pub current: f64,
}

/// Alerts are a pure function of the current stats; nothing is stored.
pub fn derive_alerts(
    requests: &RequestStats,
    system: &SystemStats,
    budget: &PerformanceBudget,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if requests.p95 > budget.response_time_ms {
        alerts.push(Alert {
            kind: AlertKind::Performance,
            level: AlertLevel::Warning,
            message: "High response time detected".into(),
            threshold: budget.response_time_ms,
            current: requests.p95,
        });
    }

    if requests.error_rate > budget.error_rate_pct {
        alerts.push(Alert {
            kind: AlertKind::Error,
            level: AlertLevel::Critical,
            message: "High error rate detected".into(),
            threshold: budget.error_rate_pct,
            current: requests.error_rate,
        });
    }

    if system.current_memory_usage > budget.memory_mb {
        alerts.push(Alert {
            kind: AlertKind::Memory,
            level: AlertLevel::Warning,
            message: "High memory usage detected".into(),
            threshold: budget.memory_mb as f64,
            current: system.current_memory_usage as f64,
        });
    }

    alerts
}

/// The values a budget verdict was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInputs {
    pub p95: f64,
    pub error_rate: f64,
    pub memory_usage: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetReport {
    pub passed: bool,
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
    pub current: BudgetInputs,
}

/// Compare current stats to the budget. Values equal to a threshold pass.
pub fn validate_budget(
    requests: &RequestStats,
    system: &SystemStats,
    budget: &PerformanceBudget,
) -> BudgetReport {
    let mut violations = Vec::new();
    let mut recommendations = Vec::new();

    if requests.p95 > budget.response_time_ms {
        violations.push(format!(
            "95th percentile response time ({:.0}ms) exceeds budget ({:.0}ms)",
            requests.p95, budget.response_time_ms
        ));
        recommendations
            .push("Optimize slow endpoints, add caching, or review database queries".into());
    }

    if requests.error_rate > budget.error_rate_pct {
        violations.push(format!(
            "Error rate ({}%) exceeds budget ({}%)",
            requests.error_rate, budget.error_rate_pct
        ));
        recommendations
            .push("Investigate failing routes and improve error handling".into());
    }

    if system.current_memory_usage > budget.memory_mb {
        violations.push(format!(
            "Memory usage ({}MB) exceeds budget ({}MB)",
            system.current_memory_usage, budget.memory_mb
        ));
        recommendations
            .push("Look for memory leaks and reduce in-process caching".into());
    }

    BudgetReport {
        passed: violations.is_empty(),
        violations,
        recommendations,
        current: BudgetInputs {
            p95: requests.p95,
            error_rate: requests.error_rate,
            memory_usage: system.current_memory_usage,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(current: u64) -> SystemStats {
        SystemStats {
            avg_memory_usage: current,
            peak_memory_usage: current,
            current_memory_usage: current,
        }
    }

    #[test]
    fn slow_p95_raises_one_performance_warning() {
        let requests = RequestStats {
            count: 10,
            p95: 1500.0,
            ..RequestStats::empty()
        };
        let alerts = derive_alerts(&requests, &system(100), &PerformanceBudget::default());

        let perf: Vec<_> = alerts
            .iter()
            .filter(|a| a.kind == AlertKind::Performance)
            .collect();
        assert_eq!(perf.len(), 1);
        assert_eq!(perf[0].level, AlertLevel::Warning);
        assert_eq!(perf[0].threshold, 1000.0);
        assert_eq!(perf[0].current, 1500.0);
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn high_error_rate_is_critical() {
        let requests = RequestStats {
            count: 10,
            error_rate: 20.0,
            ..RequestStats::empty()
        };
        let alerts = derive_alerts(&requests, &system(100), &PerformanceBudget::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Error);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn memory_over_budget_warns() {
        let alerts = derive_alerts(
            &RequestStats::empty(),
            &system(600),
            &PerformanceBudget::default(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Memory);
        assert_eq!(alerts[0].current, 600.0);
    }

    #[test]
    fn thresholds_themselves_do_not_alert() {
        let requests = RequestStats {
            count: 1,
            p95: 1000.0,
            error_rate: 5.0,
            ..RequestStats::empty()
        };
        let budget = PerformanceBudget::default();
        assert!(derive_alerts(&requests, &system(512), &budget).is_empty());
        assert!(validate_budget(&requests, &system(512), &budget).passed);
    }

    #[test]
    fn budget_report_lists_each_violation() {
        let requests = RequestStats {
            count: 10,
            p95: 2400.0,
            error_rate: 12.5,
            ..RequestStats::empty()
        };
        let report = validate_budget(&requests, &system(900), &PerformanceBudget::default());
        assert!(!report.passed);
        assert_eq!(report.violations.len(), 3);
        assert_eq!(report.recommendations.len(), 3);
        assert!(report.violations[0].contains("2400ms"));
        assert!(report.violations[1].contains("12.5%"));
        assert!(report.violations[2].contains("900MB"));
        assert_eq!(report.current.memory_usage, 900);
    }

    #[test]
    fn alert_serializes_kind_as_type() {
        let alert = Alert {
            kind: AlertKind::Performance,
            level: AlertLevel::Warning,
            message: "x".into(),
            threshold: 1000.0,
            current: 1500.0,
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "performance");
        assert_eq!(json["level"], "warning");
    }
}
