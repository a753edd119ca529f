use serde::Serialize;

use super::RequestSample;

/// Aggregate view of a set of request samples.
/// Serialized straight into the dashboard JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub count: u64,
    /// Mean latency, rounded to the nearest millisecond
    pub avg_response_time: u64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    /// Percentage of samples with status ≥ 400, two decimals
    pub error_rate: f64,
    pub requests_per_minute: f64,
}

impl RequestStats {
    /// All-zero placeholder for an empty window or unknown route.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build stats from every sample already filtered to the window.
    pub fn from_samples<'a, I>(samples: I, window_ms: u64) -> Self
    where
        I: IntoIterator<Item = &'a RequestSample>,
    {
        let mut latencies = Vec::new();
        let mut errors = 0u64;
        for s in samples {
            latencies.push(s.latency_ms);
            if s.is_error() {
                errors += 1;
            }
        }

        if latencies.is_empty() {
            return Self::empty();
        }

        latencies.sort_by(|a, b| a.total_cmp(b));
        let count = latencies.len() as u64;
        let mean = latencies.iter().sum::<f64>() / count as f64;
        let window_minutes = window_ms as f64 / 60_000.0;

        Self {
            count,
            avg_response_time: mean.round() as u64,
            p50: percentile(&latencies, 0.50),
            p95: percentile(&latencies, 0.95),
            p99: percentile(&latencies, 0.99),
            error_rate: round2(errors as f64 / count as f64 * 100.0),
            requests_per_minute: if window_minutes > 0.0 {
                round2(count as f64 / window_minutes)
            } else {
                0.0
            },
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// Linear-interpolated percentile over an ascending slice.
///
/// `p` is a fraction in `[0, 1]`. The rank is `p * (n - 1)`; the result
/// blends the values at the floor and ceiling ranks by the fractional part.
/// A ceiling rank past the end clamps to the last element. The floor rank
/// needs no clamp because `p` is never negative.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let Some(&last) = sorted.last() else {
        return 0.0;
    };

    let index = p * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    if upper >= sorted.len() {
        return last;
    }

    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
