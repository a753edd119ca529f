use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Metrics ─────────────────────────────────────────────
        .route("/api/metrics/requests", get(handlers::metrics::request_stats))
        .route("/api/metrics/errors", get(handlers::metrics::error_stats))
        .route("/api/metrics/system", get(handlers::metrics::system_stats))
        .route("/api/metrics/dashboard", get(handlers::metrics::dashboard))
        .route("/api/metrics/budget", get(handlers::metrics::budget))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        // ── Health ──────────────────────────────────────────────
        .route("/health", get(handlers::health::health))
        .route("/health/live", get(handlers::health::live))
        .fallback(handlers::not_found)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(CorsLayer::permissive())
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}
