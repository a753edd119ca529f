use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::{BudgetReport, DashboardMetrics, ErrorStats, RequestStats, SystemStats};
use crate::AppState;

use super::StatsQuery;

// ─── GET /api/metrics/requests ───────────────────────────────────
/// Without `route`, aggregates across every route.

pub async fn request_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<RequestStats>, AppError> {
    let window = query.window_ms()?;
    Ok(Json(state.metrics.request_stats(query.route.as_deref(), window)))
}

// ─── GET /api/metrics/errors ─────────────────────────────────────

pub async fn error_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ErrorStats>, AppError> {
    Ok(Json(state.metrics.error_stats(query.window_ms()?)))
}

// ─── GET /api/metrics/system ─────────────────────────────────────

pub async fn system_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<SystemStats>, AppError> {
    Ok(Json(state.metrics.system_stats(query.window_ms()?)))
}

// ─── GET /api/metrics/dashboard ──────────────────────────────────

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardMetrics> {
    Json(state.metrics.dashboard())
}

// ─── GET /api/metrics/budget ─────────────────────────────────────

pub async fn budget(State(state): State<Arc<AppState>>) -> Json<BudgetReport> {
    let report = state.metrics.validate_budget();
    if !report.passed {
        tracing::info!(violations = report.violations.len(), "performance budget exceeded");
    }
    Json(report)
}
