use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use perf_monitor::config::MonitorConfig;
use perf_monitor::metrics::snapshot::SnapshotTask;
use perf_monitor::{server, AppState};

#[derive(Parser, Debug)]
#[command(name = "perf-monitor", version, about = "Sliding-window request metrics and health")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "perf-monitor.toml")]
    config: PathBuf,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── 1. Tracing ───────────────────────────────────────────────
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "perf-monitor starting");

    // ── 2. Config ────────────────────────────────────────────────
    if cli.config.exists() {
        info!(path = %cli.config.display(), "loading config file");
    } else {
        info!("no config file found, using defaults and environment");
    }
    let config = MonitorConfig::load(&cli.config)?;
    let addr = config.server.addr.clone();

    // ── 3. Shared state + background snapshots ───────────────────
    let state = Arc::new(AppState::from_config(config)?);
    let snapshots = SnapshotTask::spawn(state.metrics.clone(), state.snapshot_interval());

    // ── 4. Bind & serve ──────────────────────────────────────────
    let app = server::create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening");
    info!("dashboard JSON → /api/metrics/dashboard, SSE → /api/metrics/stream, health → /health");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    snapshots.stop().await;
    info!("perf-monitor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
