//! Push-based health reporter.
//!
//! Periodically outputs engine/cache/bus health as structured JSON to
//! stdout. No HTTP server, no incoming connections — only outbound log
//! lines, reporting engine health for a read-only analysis engine with no
//! portfolio to report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::infrastructure::observability::metrics::Metrics;

/// Health snapshot for JSON output.
#[derive(Serialize)]
pub struct HealthSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub engine: EngineSnapshot,
    pub bus: BusSnapshot,
}

#[derive(Serialize)]
pub struct EngineSnapshot {
    pub active_symbols: usize,
    pub session_generation: u64,
    pub state: String,
}

#[derive(Serialize)]
pub struct BusSnapshot {
    pub subscriber_count: usize,
    pub lag_events_total: u64,
}

/// Shared counters the engine updates as it runs; the reporter only reads
/// them on its own cadence.
#[derive(Debug, Default)]
pub struct HealthState {
    pub active_symbols: usize,
    pub session_generation: u64,
    pub engine_state: String,
    pub subscriber_count: usize,
    pub lag_events_total: u64,
}

/// Outputs a [`HealthSnapshot`] as a JSON log line on a fixed interval.
pub struct MetricsReporter {
    state: Arc<RwLock<HealthState>>,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(state: Arc<RwLock<HealthState>>, metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            state,
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Runs the reporter loop until the process exits. Intended to be
    /// `tokio::spawn`-ed alongside the engine.
    pub async fn run(self) {
        info!(interval = ?self.interval, "starting push-based health reporting");

        loop {
            tokio::time::sleep(self.interval).await;

            match self.collect_snapshot().await {
                Ok(snapshot) => match serde_json::to_string(&snapshot) {
                    Ok(json) => {
                        println!("METRICS_JSON:{}", json);
                        info!(
                            active_symbols = snapshot.engine.active_symbols,
                            uptime_seconds = snapshot.uptime_seconds,
                            "health snapshot reported"
                        );
                    }
                    Err(e) => warn!(error = %e, "failed to serialize health snapshot"),
                },
                Err(e) => warn!(error = %e, "failed to collect health snapshot"),
            }
        }
    }

    async fn collect_snapshot(&self) -> anyhow::Result<HealthSnapshot> {
        let state = self.state.read().await;
        let uptime = self.start_time.elapsed().as_secs();

        self.metrics.active_symbols.set(state.active_symbols as f64);
        self.metrics.session_generation.set(state.session_generation as f64);
        self.metrics.uptime_seconds.set(uptime as f64);

        Ok(HealthSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine: EngineSnapshot {
                active_symbols: state.active_symbols,
                session_generation: state.session_generation,
                state: state.engine_state.clone(),
            },
            bus: BusSnapshot {
                subscriber_count: state.subscriber_count,
                lag_events_total: state.lag_events_total,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_snapshot_collection() {
        let state = Arc::new(RwLock::new(HealthState {
            active_symbols: 4,
            session_generation: 1,
            engine_state: "Running".to_string(),
            subscriber_count: 2,
            lag_events_total: 0,
        }));
        let metrics = Metrics::new().expect("failed to create metrics");
        let reporter = MetricsReporter::new(state, metrics, 60);

        let snapshot = reporter.collect_snapshot().await.expect("failed to collect snapshot");
        assert_eq!(snapshot.engine.active_symbols, 4);
        assert_eq!(snapshot.engine.state, "Running");
        assert!(!snapshot.timestamp.is_empty());
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = HealthSnapshot {
            timestamp: "2026-01-10T10:00:00Z".to_string(),
            uptime_seconds: 3600,
            version: "0.1.0".to_string(),
            engine: EngineSnapshot {
                active_symbols: 3,
                session_generation: 2,
                state: "Running".to_string(),
            },
            bus: BusSnapshot { subscriber_count: 1, lag_events_total: 0 },
        };

        let json = serde_json::to_string(&snapshot).expect("failed to serialize");
        assert!(json.contains("active_symbols"));
        assert!(json.contains("Running"));
    }
}
