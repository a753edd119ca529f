//! HTTP-level tests for the metrics and health endpoints.
//!
//! Uses `tower::ServiceExt::oneshot` to call the router without binding a
//! real TCP port — every test gets a fresh in-memory store.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use perf_monitor::config::MonitorConfig;
use perf_monitor::health::HealthAggregator;
use perf_monitor::metrics::{FixedMemorySampler, MetricsStore, SystemClock};
use perf_monitor::{server, AppState};
use std::sync::Arc;
use tower::ServiceExt; // .oneshot()

// ── Helper ────────────────────────────────────────────────────

fn make_state(memory_mb: u64) -> Arc<AppState> {
    let config = MonitorConfig::default();
    let metrics = Arc::new(MetricsStore::new(
        config.metrics.limits(),
        config.budget,
        Arc::new(SystemClock),
        Arc::new(FixedMemorySampler::new(memory_mb)),
    ));
    let health = HealthAggregator::from_config(&config.health).unwrap();
    Arc::new(AppState {
        config,
        metrics,
        health,
    })
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("user-agent", "api-tests")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn hit(app: &Router, uri: &str) -> axum::response::Response {
    app.clone().oneshot(get_req(uri)).await.unwrap()
}

// ── Health ────────────────────────────────────────────────────

#[tokio::test]
async fn liveness_returns_200() {
    let app = server::create_router(make_state(100));
    let resp = hit(&app, "/health/live").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "alive");
}

#[tokio::test]
async fn health_without_dependencies_is_healthy() {
    let app = server::create_router(make_state(100));
    let resp = hit(&app, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["status"], "healthy");
    let checks = json["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 4);
    assert!(checks.iter().all(|c| c["status"] == "not_configured"));
    assert_eq!(json["metrics"]["count"], 0);
}

#[tokio::test]
async fn unreachable_dependency_is_unhealthy_503() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let mut config = MonitorConfig::default();
    config.health.database_addr = Some(addr);
    let state = AppState {
        metrics: make_state(100).metrics.clone(),
        health: HealthAggregator::from_config(&config.health).unwrap(),
        config,
    };

    let app = server::create_router(Arc::new(state));
    let resp = hit(&app, "/health").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["checks"][0]["name"], "database");
    assert_eq!(json["checks"][0]["status"], "unhealthy");
}

// ── Recording through the middleware ─────────────────────────

#[tokio::test]
async fn responses_carry_timing_headers() {
    let app = server::create_router(make_state(100));
    let resp = hit(&app, "/health/live").await;
    let header = resp.headers().get("x-response-time").unwrap();
    assert!(header.to_str().unwrap().ends_with("ms"));
    assert!(resp.headers().contains_key("server-timing"));
}

#[tokio::test]
async fn numeric_paths_share_one_route_key() {
    let state = make_state(100);
    let app = server::create_router(state.clone());

    assert_eq!(hit(&app, "/courses/42").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(hit(&app, "/courses/917").await.status(), StatusCode::NOT_FOUND);

    let resp = hit(&app, "/api/metrics/requests?route=GET:/courses/:id").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["errorRate"], 100.0);
}

#[tokio::test]
async fn raw_path_filter_matches_normalized_route() {
    let app = server::create_router(make_state(100));
    hit(&app, "/courses/42").await;
    hit(&app, "/courses/917").await;

    let resp = hit(&app, "/api/metrics/requests?route=GET:/courses/42").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["count"], 2);
}

#[tokio::test]
async fn failed_requests_land_in_error_breakdown() {
    let app = server::create_router(make_state(100));
    hit(&app, "/missing").await;
    hit(&app, "/missing/again").await;
    hit(&app, "/health/live").await;

    let json = body_json(hit(&app, "/api/metrics/errors").await).await;
    assert_eq!(json["totalErrors"], 2);
    assert_eq!(json["errorBreakdown"]["404"], 2);
}

#[tokio::test]
async fn unfiltered_request_stats_cover_all_routes() {
    let app = server::create_router(make_state(100));
    hit(&app, "/health/live").await;
    hit(&app, "/nowhere").await;

    let json = body_json(hit(&app, "/api/metrics/requests").await).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["errorRate"], 50.0);
    for field in ["avgResponseTime", "p50", "p95", "p99", "requestsPerMinute"] {
        assert!(json.get(field).is_some(), "missing {field}");
    }
}

#[tokio::test]
async fn bad_window_is_rejected() {
    let app = server::create_router(make_state(100));

    let resp = hit(&app, "/api/metrics/requests?window=soon").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("soon"));

    let resp = hit(&app, "/api/metrics/errors?window=0").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Dashboard & budget ───────────────────────────────────────

#[tokio::test]
async fn dashboard_has_every_section() {
    let app = server::create_router(make_state(100));
    hit(&app, "/health/live").await;
    hit(&app, "/health/live").await;
    hit(&app, "/courses/3").await;

    let json = body_json(hit(&app, "/api/metrics/dashboard").await).await;
    assert_eq!(json["requests"]["count"], 3);
    assert_eq!(json["errors"]["totalErrors"], 1);
    assert_eq!(json["system"]["currentMemoryUsage"], 100);

    let routes = json["routes"].as_array().unwrap();
    assert_eq!(routes[0]["route"], "GET:/health/live");
    assert_eq!(routes[0]["count"], 2);
    assert_eq!(routes[1]["route"], "GET:/courses/:id");

    // 1 of 3 requests failed, above the 5% budget.
    let alerts = json["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["type"], "error");
    assert_eq!(alerts[0]["level"], "critical");
}

#[tokio::test]
async fn budget_passes_on_quiet_service() {
    let app = server::create_router(make_state(100));
    let json = body_json(hit(&app, "/api/metrics/budget").await).await;
    assert_eq!(json["passed"], true);
    assert!(json["violations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn budget_flags_memory_over_limit() {
    let app = server::create_router(make_state(900));
    let json = body_json(hit(&app, "/api/metrics/budget").await).await;
    assert_eq!(json["passed"], false);
    let violations = json["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 1);
    assert!(violations[0].as_str().unwrap().contains("900MB"));
    assert_eq!(json["recommendations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn system_stats_endpoint_reads_live_memory() {
    let app = server::create_router(make_state(256));
    let json = body_json(hit(&app, "/api/metrics/system").await).await;
    assert_eq!(json["currentMemoryUsage"], 256);
    assert_eq!(json["avgMemoryUsage"], 0);
}
