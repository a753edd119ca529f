use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::AppState;

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes a full `DashboardMetrics` as JSON every `stream_interval_ms`.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let every = Duration::from_millis(state.config.metrics.stream_interval_ms);
    let interval = tokio::time::interval(every);

    let stream = IntervalStream::new(interval).map(move |_| {
        let dashboard = state.metrics.dashboard();
        let json = serde_json::to_string(&dashboard).unwrap_or_default();
        Ok(Event::default().event("dashboard").data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
