//! The supervised background worker that drives one symbol's analysis
//! cycle: fetch candles through the cache, run the analyzer registry across
//! every configured timeframe, aggregate via the multi-timeframe
//! orchestrator, derive a setup status, and publish a [`ConfluenceUpdate`]
//! onto the subscriber bus.
//!
//! State machine:
//!
//! ```text
//! Idle -> Starting -> Running <-> Paused -> Stopping -> Stopped
//!                        |
//!                        +-- Error (recoverable) -> Running
//! ```
//!
//! One engine instance analyzes one symbol. Running several symbols means
//! spawning several engines, each with its own stop token, matching the
//! per-symbol ordering guarantee: updates for one symbol are never
//! reordered, but there is no cross-symbol ordering promise.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{info, warn};

use crate::application::analyzers::registry::AnalyzerRegistry;
use crate::application::session::SessionEvent;
use crate::config::{AnalysisDepth, Config};
use crate::domain::confluence::{FactorContribution, MarketBias};
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::MarketDataPort;
use crate::domain::signal::{Direction, Signal, SignalCategory};
use crate::infrastructure::bus::{BusMessage, SubscriberBus};
use crate::infrastructure::cache::MarketDataCache;
use crate::infrastructure::core::circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
use crate::infrastructure::core::retry::retry_with_backoff_metered;
use crate::infrastructure::observability::metrics::Metrics;
use crate::infrastructure::observability::reporter::HealthState;

/// Consecutive fetch failures (each already retried with backoff) before the
/// breaker opens and short-circuits further bridge calls.
const CIRCUIT_FAILURE_THRESHOLD: usize = 5;
/// Consecutive successes required in `HalfOpen` before the breaker closes.
const CIRCUIT_SUCCESS_THRESHOLD: usize = 2;
/// How long the breaker stays `Open` before allowing a trial call.
const CIRCUIT_OPEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of an [`AnalysisEngine`], mirrored into [`HealthState`]
/// for the push-based reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Starting,
    Running,
    Paused,
    Stopping,
    Stopped,
    Error,
}

impl EngineState {
    fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "Idle",
            EngineState::Starting => "Starting",
            EngineState::Running => "Running",
            EngineState::Paused => "Paused",
            EngineState::Stopping => "Stopping",
            EngineState::Stopped => "Stopped",
            EngineState::Error => "Error",
        }
    }
}

/// Coarse summary of whether the current aggregate suggests a tradable
/// configuration. Advisory only — the engine never trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Valid,
    Forming,
    NoSetup,
}

/// One timeframe's contribution to a [`ConfluenceUpdate`].
#[derive(Debug, Clone)]
pub struct TimeframeDetail {
    pub timeframe: Timeframe,
    pub bullish: Decimal,
    pub bearish: Decimal,
    pub confidence: Decimal,
    pub bias: MarketBias,
}

/// The engine's per-iteration output, matching the subscriber interface
/// every consumer of the bus sees.
#[derive(Debug, Clone)]
pub struct ConfluenceUpdate {
    pub symbol: String,
    pub timeframe_set: Vec<Timeframe>,
    pub overall_bias: MarketBias,
    pub overall_bullish: Decimal,
    pub overall_bearish: Decimal,
    pub overall_confidence: Decimal,
    pub timeframe_details: Vec<TimeframeDetail>,
    pub top_factors: Vec<FactorContribution>,
    pub setup_status: SetupStatus,
    pub direction: Direction,
    pub raw_candles: Vec<Candle>,
    pub session_id: u64,
    pub warnings: Vec<String>,
}

/// How many bars of history each [`AnalysisDepth`] tier hands to the
/// analyzer registry. Deeper tiers see more history at the cost of more
/// per-iteration CPU work.
fn window_size_for_depth(depth: AnalysisDepth) -> usize {
    match depth {
        AnalysisDepth::Fast => 50,
        AnalysisDepth::Standard => 200,
        AnalysisDepth::Deep => 500,
    }
}

/// Average confidence of retained signals in `category`, `0` if none are
/// present — a deliberately conservative default since the setup-status
/// thresholds treat an absent component as "not met" rather than skip it.
fn average_confidence(signals: &[Signal], category: SignalCategory) -> Decimal {
    let matching: Vec<&Signal> = signals.iter().filter(|s| s.category == category).collect();
    if matching.is_empty() {
        return Decimal::ZERO;
    }
    matching.iter().map(|s| s.confidence).sum::<Decimal>() / Decimal::from(matching.len())
}

/// Derives the coarse setup-status label from the overall confluence
/// confidence plus the structure and candlestick-pattern sub-scores.
fn derive_setup_status(confluence: Decimal, structure: Decimal, pattern: Decimal) -> SetupStatus {
    if confluence >= dec!(65) && structure >= dec!(55) && pattern >= dec!(50) {
        SetupStatus::Valid
    } else if confluence >= dec!(50) || structure >= dec!(50) || pattern >= dec!(45) {
        SetupStatus::Forming
    } else {
        SetupStatus::NoSetup
    }
}

/// Derives a coarse direction from the overall bullish score: `>52` is
/// bullish, `<48` is bearish, the band between is neutral.
fn derive_direction(overall_bullish: Decimal) -> Direction {
    if overall_bullish > dec!(52) {
        Direction::Bullish
    } else if overall_bullish < dec!(48) {
        Direction::Bearish
    } else {
        Direction::Neutral
    }
}

/// Owns the per-symbol analysis loop. Construct one per symbol under
/// analysis; `run` drives it until the shared stop token fires.
pub struct AnalysisEngine {
    config: Config,
    cache: Arc<MarketDataCache>,
    bus: Arc<SubscriberBus>,
    registry: Arc<AnalyzerRegistry>,
    health: Arc<RwLock<HealthState>>,
    session_id: Arc<AtomicU64>,
    circuit_breaker: CircuitBreaker,
    metrics: Option<Arc<Metrics>>,
}

impl AnalysisEngine {
    pub fn new(
        config: Config,
        port: Arc<dyn MarketDataPort>,
        bus: Arc<SubscriberBus>,
        health: Arc<RwLock<HealthState>>,
    ) -> Self {
        let cache = Arc::new(MarketDataCache::with_policy(
            port,
            config.cache_staleness_factor,
            config.full_refresh_interval_mins,
        ));
        Self {
            config,
            cache,
            bus,
            registry: Arc::new(AnalyzerRegistry::new()),
            health,
            session_id: Arc::new(AtomicU64::new(0)),
            circuit_breaker: CircuitBreaker::new(
                "bridge-fetch",
                CIRCUIT_FAILURE_THRESHOLD,
                CIRCUIT_SUCCESS_THRESHOLD,
                CIRCUIT_OPEN_TIMEOUT,
            ),
            metrics: None,
        }
    }

    /// Same as [`Self::new`], additionally wiring a metrics sink into both
    /// the engine (circuit-breaker state, retry counts, confluence
    /// confidence) and its cache (hit/top-up/full-refresh counters).
    pub fn new_with_metrics(
        config: Config,
        port: Arc<dyn MarketDataPort>,
        bus: Arc<SubscriberBus>,
        health: Arc<RwLock<HealthState>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let cache = Arc::new(
            MarketDataCache::with_policy(
                port,
                config.cache_staleness_factor,
                config.full_refresh_interval_mins,
            )
            .with_metrics(metrics.clone()),
        );
        Self {
            config,
            cache,
            bus,
            registry: Arc::new(AnalyzerRegistry::new()),
            health,
            session_id: Arc::new(AtomicU64::new(0)),
            circuit_breaker: CircuitBreaker::new(
                "bridge-fetch",
                CIRCUIT_FAILURE_THRESHOLD,
                CIRCUIT_SUCCESS_THRESHOLD,
                CIRCUIT_OPEN_TIMEOUT,
            ),
            metrics: Some(metrics),
        }
    }

    /// Fetches candles through the retry helper, then the circuit breaker:
    /// an exhausted retry sequence counts as a single breaker failure rather
    /// than `MAX_ATTEMPTS` of them, so the breaker opens on consecutive
    /// *iterations* failing, not consecutive HTTP calls. When the breaker is
    /// open, the call short-circuits to `BridgeUnavailable` without touching
    /// the bridge at all.
    async fn fetch_candles_guarded(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: u32,
        force_refresh: bool,
    ) -> Result<crate::domain::market::candle::CandleWindow, crate::domain::errors::ErrorKind> {
        let label = format!("get_candles:{symbol}:{timeframe}");
        let result = self
            .circuit_breaker
            .call(retry_with_backoff_metered(&label, self.metrics.as_deref(), || {
                self.cache.get_candles(symbol, timeframe, count, force_refresh)
            }))
            .await;

        if let Some(metrics) = &self.metrics {
            let state_value = match self.circuit_breaker.state().await {
                CircuitState::Closed => 0.0,
                CircuitState::HalfOpen => 1.0,
                CircuitState::Open => 2.0,
            };
            metrics.set_circuit_breaker_state(self.circuit_breaker.name(), state_value);
        }

        match result {
            Ok(window) => Ok(window),
            Err(CircuitBreakerError::Open(reason)) => {
                Err(crate::domain::errors::ErrorKind::BridgeUnavailable { reason })
            }
            Err(CircuitBreakerError::Inner(e)) => Err(e),
        }
    }

    /// Runs the main loop for `symbol` across `timeframes` until `stop_rx`
    /// reports `true`. Session events drive cache invalidation and a forced
    /// full refresh on the next iteration.
    pub async fn run(
        &self,
        symbol: String,
        timeframes: Vec<Timeframe>,
        mut stop_rx: watch::Receiver<bool>,
        mut session_events: mpsc::Receiver<SessionEvent>,
    ) {
        let mut state = EngineState::Starting;
        let mut force_full_refresh = true;
        self.set_health_state(state, 1).await;

        loop {
            if *stop_rx.borrow() {
                break;
            }
            state = EngineState::Running;

            while let Ok(event) = session_events.try_recv() {
                match event {
                    SessionEvent::AccountChanged { old, new } => {
                        info!(symbol = %symbol, "session changed, flushing cache and re-initializing");
                        self.cache.invalidate(None).await;
                        self.session_id.fetch_add(1, Ordering::SeqCst);
                        force_full_refresh = true;
                        self.bus.publish(BusMessage::SessionChanged { old: Some(old), new });
                    }
                    SessionEvent::Disconnected => {
                        warn!(symbol = %symbol, "bridge disconnected");
                        self.bus.publish(BusMessage::Error(crate::domain::errors::ErrorKind::NoAccount));
                    }
                    SessionEvent::SignificantChange { .. } => {
                        // Not subscriber-visible; logged for operators, not
                        // surfaced to UIs.
                        info!(symbol = %symbol, "significant balance/equity/margin change observed");
                    }
                }
            }

            match self.run_iteration(&symbol, &timeframes, force_full_refresh).await {
                Ok(update) => {
                    self.bus.publish(BusMessage::ConfluenceUpdate(Box::new(update)));
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "iteration failed, degrading gracefully");
                    if e.is_subscriber_visible() {
                        self.bus.publish(BusMessage::Error(e));
                    }
                }
            }
            force_full_refresh = false;
            self.set_health_state(state, 1).await;

            let sleep_secs = self.config.poll_interval_secs.max(1);
            tokio::select! {
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(sleep_secs)) => {}
            }
        }

        state = EngineState::Stopped;
        self.set_health_state(state, 0).await;
        info!(symbol = %symbol, "engine stopped");
    }

    /// One full fetch -> analyze -> aggregate -> derive cycle. Per-timeframe
    /// fetch failures (`InsufficientData`/`InvalidTimeframe`) are recorded as
    /// warnings rather than aborting the whole iteration; the iteration only
    /// errors out when every timeframe failed.
    async fn run_iteration(
        &self,
        symbol: &str,
        timeframes: &[Timeframe],
        force_full_refresh: bool,
    ) -> Result<ConfluenceUpdate, crate::domain::errors::ErrorKind> {
        let window_size = window_size_for_depth(self.config.analysis_depth);
        let mut all_signals: Vec<Signal> = Vec::new();
        let mut details: Vec<TimeframeDetail> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut raw_candles: Vec<Candle> = Vec::new();
        let mut finest_seen: Option<Timeframe> = None;

        let confluence_engine = crate::application::confluence::ConfluenceEngine::new();

        for &tf in timeframes {
            let fetch_count = (window_size as u32).max(50);
            let result = self
                .fetch_candles_guarded(symbol, tf, fetch_count, force_full_refresh)
                .await;

            let window = match result {
                Ok(window) => window,
                Err(e) => {
                    warnings.push(format!("{tf}: {e}"));
                    continue;
                }
            };

            let (sufficient, reason) = window.check_sufficiency(20);
            if !sufficient {
                warnings.push(format!("{tf}: {}", reason.unwrap_or_default()));
                continue;
            }

            let tail = window.tail(window_size);
            let signals = self.registry.analyze(symbol, tail);
            let confluence = confluence_engine.calculate_confluence(&signals, self.config.min_confidence_threshold);

            if let Some(metrics) = &self.metrics {
                metrics.set_confluence_confidence(
                    symbol,
                    &tf.to_string(),
                    crate::application::confluence::to_f64_lossy(confluence.confidence_percentage),
                );
            }

            details.push(TimeframeDetail {
                timeframe: tf,
                bullish: confluence.bullish_score,
                bearish: confluence.bearish_score,
                confidence: confluence.confidence_percentage,
                bias: confluence.market_bias,
            });

            let is_finer = match finest_seen {
                None => true,
                Some(f) => tf < f,
            };
            if is_finer {
                finest_seen = Some(tf);
                raw_candles = window.tail(200).to_vec();
            }

            all_signals.extend(signals);
        }

        if details.is_empty() {
            return Err(crate::domain::errors::ErrorKind::InsufficientData {
                symbol: symbol.to_string(),
                timeframe: format!("{:?}", timeframes),
                reason: "every configured timeframe was skipped".to_string(),
            });
        }

        // Aggregates the per-timeframe confluences computed above with the
        // same weighted-average formula `MultiTimeframeOrchestrator` uses,
        // rather than re-running the analyzer registry a second time through
        // `analyze_multiple_timeframes` (the registry already ran once per
        // timeframe in the loop above).
        let weights = &self.config.timeframe_weights;
        let mut weight_map: HashMap<Timeframe, Decimal> = HashMap::new();
        for d in &details {
            let w = weights.get(&d.timeframe).copied().unwrap_or_else(|| d.timeframe.default_weight());
            weight_map.insert(d.timeframe, w);
        }
        let normalized = crate::application::orchestrator::TimeframeWeight::normalize(&weight_map);

        let mut overall_bullish = Decimal::ZERO;
        let mut overall_bearish = Decimal::ZERO;
        let mut overall_confidence = Decimal::ZERO;
        for d in &details {
            let w = normalized.get(&d.timeframe).copied().unwrap_or(Decimal::ZERO);
            overall_bullish += d.bullish * w;
            overall_bearish += d.bearish * w;
            overall_confidence += d.confidence * w;
        }
        let overall_bias = MarketBias::from_diff(overall_bullish - overall_bearish);

        let top_factors = confluence_engine
            .calculate_confluence(&all_signals, self.config.min_confidence_threshold)
            .top_factors;

        let structure_score = average_confidence(&all_signals, SignalCategory::Structure);
        let pattern_score = average_confidence(&all_signals, SignalCategory::Candlestick);
        let setup_status = derive_setup_status(overall_confidence, structure_score, pattern_score);
        let direction = derive_direction(overall_bullish);

        Ok(ConfluenceUpdate {
            symbol: symbol.to_string(),
            timeframe_set: timeframes.to_vec(),
            overall_bias,
            overall_bullish,
            overall_bearish,
            overall_confidence,
            timeframe_details: details,
            top_factors,
            setup_status,
            direction,
            raw_candles,
            session_id: self.session_id.load(Ordering::SeqCst),
            warnings,
        })
    }

    async fn set_health_state(&self, state: EngineState, active_symbols: usize) {
        let mut h = self.health.write().await;
        h.active_symbols = active_symbols;
        h.session_generation = self.session_id.load(Ordering::SeqCst);
        h.engine_state = state.as_str().to_string();
        h.subscriber_count = self.bus.subscriber_count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::domain::account::AccountSnapshot;
    use crate::domain::errors::ErrorKind;
    use crate::domain::ports::SymbolInfo;

    struct FakePort {
        bars: usize,
    }

    fn make_candles(n: usize) -> Vec<Candle> {
        let now = crate::domain::clock::now_millis();
        (0..n)
            .map(|i| {
                let base = Decimal::from(100 + i as i64);
                Candle {
                    timestamp: now - ((n - i) as i64) * 60_000,
                    open: base,
                    high: base + dec!(1),
                    low: base - dec!(1),
                    close: base + dec!(0.5),
                    tick_volume: 100,
                    real_volume: 0,
                    spread: 1,
                }
            })
            .collect()
    }

    #[async_trait]
    impl MarketDataPort for FakePort {
        async fn initialize(&self) -> Result<(), ErrorKind> {
            Ok(())
        }
        async fn shutdown(&self) {}
        async fn account_info(&self) -> Result<AccountSnapshot, ErrorKind> {
            Err(ErrorKind::NoAccount)
        }
        async fn symbols_list(&self) -> Result<Vec<String>, ErrorKind> {
            Ok(vec!["EURUSD".to_string()])
        }
        async fn symbol_info(&self, _symbol: &str) -> Result<SymbolInfo, ErrorKind> {
            Err(ErrorKind::NoSymbols)
        }
        async fn copy_rates_from_pos(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _start_pos: u32,
            _count: u32,
        ) -> Result<Vec<Candle>, ErrorKind> {
            Ok(make_candles(self.bars))
        }
        async fn copy_rates_from(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _from_millis: i64,
            _count: u32,
        ) -> Result<Vec<Candle>, ErrorKind> {
            Ok(vec![])
        }
    }

    fn test_engine(bars: usize) -> AnalysisEngine {
        let port: Arc<dyn MarketDataPort> = Arc::new(FakePort { bars });
        let bus = Arc::new(SubscriberBus::new(16));
        let health = Arc::new(RwLock::new(HealthState::default()));
        AnalysisEngine::new(Config::default(), port, bus, health)
    }

    #[tokio::test]
    async fn test_single_iteration_produces_update() {
        let engine = test_engine(100);
        let update = engine
            .run_iteration("EURUSD", &[Timeframe::H1], true)
            .await
            .expect("iteration should succeed with enough bars");
        assert_eq!(update.symbol, "EURUSD");
        assert!(!update.timeframe_details.is_empty());
        assert!(update.raw_candles.len() <= 200);
    }

    #[tokio::test]
    async fn test_insufficient_data_skips_timeframe() {
        let engine = test_engine(5);
        let result = engine.run_iteration("EURUSD", &[Timeframe::H1], true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_multi_timeframe_aggregates_all_details() {
        let engine = test_engine(100);
        let update = engine
            .run_iteration("EURUSD", &[Timeframe::H1, Timeframe::H4, Timeframe::D1], true)
            .await
            .expect("should succeed");
        assert_eq!(update.timeframe_details.len(), 3);
    }

    #[test]
    fn test_setup_status_thresholds() {
        assert_eq!(derive_setup_status(dec!(70), dec!(60), dec!(55)), SetupStatus::Valid);
        assert_eq!(derive_setup_status(dec!(55), dec!(30), dec!(20)), SetupStatus::Forming);
        assert_eq!(derive_setup_status(dec!(20), dec!(10), dec!(10)), SetupStatus::NoSetup);
    }

    #[test]
    fn test_direction_thresholds() {
        assert_eq!(derive_direction(dec!(60)), Direction::Bullish);
        assert_eq!(derive_direction(dec!(40)), Direction::Bearish);
        assert_eq!(derive_direction(dec!(50)), Direction::Neutral);
    }

    struct FailingPort {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl MarketDataPort for FailingPort {
        async fn initialize(&self) -> Result<(), ErrorKind> {
            Ok(())
        }
        async fn shutdown(&self) {}
        async fn account_info(&self) -> Result<AccountSnapshot, ErrorKind> {
            Err(ErrorKind::NoAccount)
        }
        async fn symbols_list(&self) -> Result<Vec<String>, ErrorKind> {
            Ok(vec![])
        }
        async fn symbol_info(&self, _symbol: &str) -> Result<SymbolInfo, ErrorKind> {
            Err(ErrorKind::NoSymbols)
        }
        async fn copy_rates_from_pos(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _start_pos: u32,
            _count: u32,
        ) -> Result<Vec<Candle>, ErrorKind> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ErrorKind::BridgeTransient { reason: "simulated outage".to_string() })
        }
        async fn copy_rates_from(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _from_millis: i64,
            _count: u32,
        ) -> Result<Vec<Candle>, ErrorKind> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_repeated_iteration_failures() {
        let port: Arc<dyn MarketDataPort> = Arc::new(FailingPort { calls: std::sync::atomic::AtomicUsize::new(0) });
        let bus = Arc::new(SubscriberBus::new(16));
        let health = Arc::new(RwLock::new(HealthState::default()));
        let engine = AnalysisEngine::new(Config::default(), port.clone(), bus, health);

        for _ in 0..CIRCUIT_FAILURE_THRESHOLD {
            let result = engine.fetch_candles_guarded("EURUSD", Timeframe::H1, 200, true).await;
            assert!(result.is_err());
        }
        assert_eq!(engine.circuit_breaker.state().await, crate::infrastructure::core::circuit_breaker::CircuitState::Open);

        let result = engine.fetch_candles_guarded("EURUSD", Timeframe::H1, 200, true).await;
        assert!(matches!(result, Err(ErrorKind::BridgeUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_metrics_record_circuit_breaker_state() {
        let port: Arc<dyn MarketDataPort> = Arc::new(FakePort { bars: 100 });
        let bus = Arc::new(SubscriberBus::new(16));
        let health = Arc::new(RwLock::new(HealthState::default()));
        let metrics = Arc::new(Metrics::new().unwrap());
        let engine =
            AnalysisEngine::new_with_metrics(Config::default(), port, bus, health, metrics.clone());

        engine.fetch_candles_guarded("EURUSD", Timeframe::H1, 200, true).await.unwrap();

        let rendered = metrics.render();
        assert!(rendered.contains("confluence_circuit_breaker_state"));
    }

    #[tokio::test]
    async fn test_session_change_flushes_cache_and_publishes() {
        let engine = test_engine(100);
        let mut rx = engine.bus.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(4);

        let old = AccountSnapshot {
            login: 1,
            server: "S1".to_string(),
            name: "Trader".to_string(),
            company: "Broker".to_string(),
            currency: "USD".to_string(),
            balance: dec!(1000),
            equity: dec!(1000),
            margin_level: dec!(200),
            timestamp: 0,
        };
        let new = AccountSnapshot { login: 2, ..old.clone() };
        event_tx.send(SessionEvent::AccountChanged { old, new }).await.unwrap();

        let handle = tokio::spawn(async move {
            engine.run("EURUSD".to_string(), vec![Timeframe::H1], stop_rx, event_rx).await;
        });

        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("message within timeout")
            .expect("some message");
        assert!(matches!(msg, BusMessage::SessionChanged { .. }));

        stop_tx.send(true).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }
}
