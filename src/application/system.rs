//! Bootstrap: wires cache, registry, confluence engine, orchestrator,
//! session monitor and bus into a running system, mirroring the teacher's
//! `Application::build`/`Application::start` split in
//! `application/system.rs` so `src/bin/server.rs` stays a thin entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::ports::MarketDataPort;
use crate::infrastructure::bridge::TerminalBridge;
use crate::infrastructure::bus::SubscriberBus;
use crate::infrastructure::observability::reporter::HealthState;
use crate::infrastructure::observability::{Metrics, MetricsReporter};

use super::engine::AnalysisEngine;
use super::session::SessionMonitor;

/// Built but not yet running: holds everything [`Application::start`] needs
/// to spawn the per-symbol engines, session monitors, and health reporter.
pub struct Application {
    config: Config,
    bridge: Arc<dyn MarketDataPort>,
    bus: Arc<SubscriberBus>,
    health: Arc<RwLock<HealthState>>,
    metrics: Option<Arc<Metrics>>,
}

/// A running system. Holds the stop signal and the spawned tasks; `stop`
/// drains them in order, matching the teacher's ctrl-c shutdown sequence in
/// `src/bin/server.rs`.
pub struct SystemHandle {
    stop_tx: watch::Sender<bool>,
    engine_handles: Vec<JoinHandle<()>>,
    bridge: Arc<dyn MarketDataPort>,
}

impl Application {
    /// Constructs the bridge from `config.bridge_base_url` and initializes
    /// shared infrastructure (bus, health state, metrics registry) without
    /// spawning anything yet.
    pub async fn build(config: Config) -> Result<Self> {
        let bridge: Arc<dyn MarketDataPort> = Arc::new(TerminalBridge::new(
            config.bridge_base_url.clone(),
            Duration::from_secs(config.bridge_timeout_secs),
        ));
        bridge
            .initialize()
            .await
            .map_err(|e| anyhow::anyhow!("bridge initialize failed: {e}"))?;

        let bus = Arc::new(SubscriberBus::new(crate::infrastructure::bus::DEFAULT_CAPACITY));
        let health = Arc::new(RwLock::new(HealthState::default()));
        let metrics = if config.observability_enabled { Some(Arc::new(Metrics::new()?)) } else { None };

        Ok(Self { config, bridge, bus, health, metrics })
    }

    /// Spawns one [`AnalysisEngine`] and [`SessionMonitor`] pair per
    /// configured symbol, plus the health reporter if observability is
    /// enabled, and returns a handle whose `stop` drives shutdown.
    pub async fn start(self) -> Result<SystemHandle> {
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut engine_handles = Vec::new();
        for symbol in &self.config.symbols {
            let engine = Arc::new(match &self.metrics {
                Some(m) => AnalysisEngine::new_with_metrics(
                    self.config.clone(),
                    self.bridge.clone(),
                    self.bus.clone(),
                    self.health.clone(),
                    m.clone(),
                ),
                None => AnalysisEngine::new(self.config.clone(), self.bridge.clone(), self.bus.clone(), self.health.clone()),
            });
            let (event_tx, event_rx) = mpsc::channel(16);

            let monitor = SessionMonitor::new(
                self.bridge.clone(),
                Duration::from_secs(self.config.session_poll_secs),
                event_tx,
            );
            let monitor_stop_rx = stop_rx.clone();
            tokio::spawn(async move {
                monitor.run(monitor_stop_rx).await;
            });

            let symbol = symbol.clone();
            let timeframes = self.config.timeframes.clone();
            let engine_stop_rx = stop_rx.clone();
            let handle = tokio::spawn(async move {
                engine.run(symbol, timeframes, engine_stop_rx, event_rx).await;
            });
            engine_handles.push(handle);
        }
        info!(count = engine_handles.len(), "analysis engines started");

        if let Some(metrics) = self.metrics {
            let reporter = MetricsReporter::new(self.health.clone(), (*metrics).clone(), self.config.observability_interval_secs);
            tokio::spawn(async move {
                reporter.run().await;
            });
            info!(interval_secs = self.config.observability_interval_secs, "health reporter started");
        } else {
            info!("health reporting disabled");
        }

        Ok(SystemHandle { stop_tx, engine_handles, bridge: self.bridge })
    }
}

impl SystemHandle {
    /// Signals every engine and session monitor to stop, waits for them to
    /// finish their current iteration, then shuts down the bridge.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        for handle in self.engine_handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "engine task panicked during shutdown");
            }
        }
        self.bridge.shutdown().await;
    }
}
