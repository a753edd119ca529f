use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::health::OverallStatus;
use crate::AppState;

// ─── GET /health ─────────────────────────────────────────────────
/// 200 while healthy or degraded, 503 once unhealthy.

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.health.report(&state.metrics).await;
    let code = match report.status {
        OverallStatus::Healthy | OverallStatus::Degraded => StatusCode::OK,
        OverallStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

// ─── GET /health/live ────────────────────────────────────────────
/// Liveness only; runs no probes.

pub async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "alive" }))
}
