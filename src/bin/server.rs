//! Headless analysis-engine server.
//!
//! Runs the read-only analysis engine with no GUI and no HTTP listener.
//! Health is pushed as structured JSON log lines to stdout.
//!
//! # Usage
//! ```sh
//! SYMBOLS=EURUSD,GBPUSD TIMEFRAMES=H1,H4,D1 cargo run --bin server
//! ```
//!
//! # Environment Variables
//! See `Config::from_env` for the full list; most relevant here:
//! - `BRIDGE_BASE_URL` - terminal bridge HTTP endpoint (default: http://127.0.0.1:18812)
//! - `SYMBOLS` - comma-separated symbol list (default: EURUSD,GBPUSD,USDJPY)
//! - `TIMEFRAMES` - comma-separated timeframe list (default: H1,H4,D1)
//! - `OBSERVABILITY_ENABLED` / `OBSERVABILITY_PORT` - health reporter cadence
//!
//! # Metrics Output
//! Metrics are output as JSON to stdout with prefix `METRICS_JSON:`. This can
//! be collected by log aggregators (Loki, Fluentd, CloudWatch Logs) or
//! redirected to a file.

use anyhow::Result;
use rustrade::application::system::Application;
use rustrade::config::Config;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Analysis engine server {} starting...", env!("CARGO_PKG_VERSION"));
    info!("Mode: HEADLESS (no UI, no HTTP server, read-only)");

    let config = Config::from_env()?;
    info!(
        symbols = ?config.symbols,
        timeframes = ?config.timeframes,
        depth = ?config.analysis_depth,
        "configuration loaded"
    );

    let app = Application::build(config).await?;
    let handle = app.start().await?;

    info!("server running, press Ctrl+C to shut down");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping engines...");

    handle.stop().await;
    info!("shutdown complete");

    Ok(())
}
