use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::{route_key::route_key, RequestSample};
use crate::AppState;

/// Records one `RequestSample` per response (plus an `ErrorSample` for
/// status ≥ 400) and adds two response headers:
///
///   X-Response-Time  — total handler wall time, e.g. `12.345ms`
///   Server-Timing    — same value in the standard Server-Timing format
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let route = route_key(method.as_str(), req.uri().path());
    let client_ip = client_ip(req.headers(), req.extensions().get::<ConnectInfo<SocketAddr>>());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = format!("{latency_ms:.3}ms").parse() {
        response.headers_mut().insert("X-Response-Time", val);
    }
    if let Ok(val) = format!("total;dur={latency_ms:.3}").parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // ── Record ──────────────────────────────────────────────────
    let status = response.status();
    let sample = RequestSample {
        route,
        status: status.as_u16(),
        latency_ms,
        timestamp_ms: state.metrics.now_ms(),
        client_ip,
        user_agent,
    };

    if status.as_u16() >= 400 {
        tracing::warn!(
            status = status.as_u16(),
            route = %sample.route,
            client = %sample.client_ip,
            latency_ms,
            "request failed"
        );
    } else {
        tracing::debug!(
            status = status.as_u16(),
            route = %sample.route,
            latency_ms,
            "request"
        );
    }
    if latency_ms > state.metrics.budget().response_time_ms {
        tracing::warn!(route = %sample.route, latency_ms, "slow request");
    }

    let reason = status.canonical_reason().unwrap_or("Unknown Error");
    if let Some(error) = sample.to_error_sample(reason) {
        state.metrics.record_error(error);
    }
    state.metrics.record_request(sample);

    response
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address.
fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_owned)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".into())
}
