//! Prometheus metric definitions for the analysis engine.
//!
//! All metrics use the `confluence_` prefix. Unlike a trading system's
//! portfolio metrics, every gauge/counter here describes engine/cache/bus
//! health, never account or order state — there is none to report.

use prometheus::{
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Symbols currently under active analysis.
    pub active_symbols: GenericGauge<AtomicF64>,
    /// Cache hits (fresh entry served without a bridge call).
    pub cache_hits_total: CounterVec,
    /// Cache top-up fetches (stale-but-non-empty entry, recent-tail fetch).
    pub cache_topups_total: CounterVec,
    /// Cache full-refresh fetches (empty entry or mandatory refresh elapsed).
    pub cache_full_refreshes_total: CounterVec,
    /// Subscriber-bus lag events, per subscriber.
    pub bus_lag_total: GenericGauge<AtomicF64>,
    /// Current circuit breaker state per bridge call site (0=closed,
    /// 1=half-open, 2=open).
    pub circuit_breaker_state: GaugeVec,
    /// Retry attempts spent recovering transient bridge failures.
    pub bridge_retries_total: CounterVec,
    /// Main-loop iteration latency per symbol.
    pub loop_iteration_seconds: HistogramVec,
    /// Current confluence confidence percentage per symbol/timeframe.
    pub confluence_confidence: GenericGaugeVec<AtomicF64>,
    /// Session generation counter; increments on every `AccountChanged`.
    pub session_generation: GenericGauge<AtomicF64>,
    /// Engine uptime in seconds.
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let active_symbols = Gauge::with_opts(Opts::new(
            "confluence_active_symbols",
            "Symbols currently under active analysis",
        ))?;
        registry.register(Box::new(active_symbols.clone()))?;

        let cache_hits_total = CounterVec::new(
            Opts::new("confluence_cache_hits_total", "Cache hits per symbol/timeframe"),
            &["symbol", "timeframe"],
        )?;
        registry.register(Box::new(cache_hits_total.clone()))?;

        let cache_topups_total = CounterVec::new(
            Opts::new("confluence_cache_topups_total", "Cache top-up fetches per symbol/timeframe"),
            &["symbol", "timeframe"],
        )?;
        registry.register(Box::new(cache_topups_total.clone()))?;

        let cache_full_refreshes_total = CounterVec::new(
            Opts::new(
                "confluence_cache_full_refreshes_total",
                "Cache full-refresh fetches per symbol/timeframe",
            ),
            &["symbol", "timeframe"],
        )?;
        registry.register(Box::new(cache_full_refreshes_total.clone()))?;

        let bus_lag_total = Gauge::with_opts(Opts::new(
            "confluence_bus_lag_total",
            "Cumulative subscriber-bus lag events",
        ))?;
        registry.register(Box::new(bus_lag_total.clone()))?;

        let circuit_breaker_state = GaugeVec::new(
            Opts::new(
                "confluence_circuit_breaker_state",
                "Circuit breaker state per call site (0=closed, 1=half-open, 2=open)",
            ),
            &["call_site"],
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let bridge_retries_total = CounterVec::new(
            Opts::new("confluence_bridge_retries_total", "Retry attempts per bridge operation"),
            &["operation"],
        )?;
        registry.register(Box::new(bridge_retries_total.clone()))?;

        let loop_iteration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "confluence_loop_iteration_seconds",
                "Main-loop iteration latency per symbol",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["symbol"],
        )?;
        registry.register(Box::new(loop_iteration_seconds.clone()))?;

        let confluence_confidence = GaugeVec::new(
            Opts::new(
                "confluence_confidence_percentage",
                "Current confidence percentage per symbol/timeframe",
            ),
            &["symbol", "timeframe"],
        )?;
        registry.register(Box::new(confluence_confidence.clone()))?;

        let session_generation = Gauge::with_opts(Opts::new(
            "confluence_session_generation",
            "Number of account changes observed since startup",
        ))?;
        registry.register(Box::new(session_generation.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "confluence_uptime_seconds",
            "Engine uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            active_symbols,
            cache_hits_total,
            cache_topups_total,
            cache_full_refreshes_total,
            bus_lag_total,
            circuit_breaker_state,
            bridge_retries_total,
            loop_iteration_seconds,
            confluence_confidence,
            session_generation,
            uptime_seconds,
        })
    }

    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families).unwrap_or_default()
    }

    pub fn inc_cache_hit(&self, symbol: &str, timeframe: &str) {
        self.cache_hits_total.with_label_values(&[symbol, timeframe]).inc();
    }

    pub fn inc_cache_topup(&self, symbol: &str, timeframe: &str) {
        self.cache_topups_total.with_label_values(&[symbol, timeframe]).inc();
    }

    pub fn inc_cache_full_refresh(&self, symbol: &str, timeframe: &str) {
        self.cache_full_refreshes_total.with_label_values(&[symbol, timeframe]).inc();
    }

    pub fn inc_bus_lag(&self, count: u64) {
        self.bus_lag_total.add(count as f64);
    }

    pub fn set_circuit_breaker_state(&self, call_site: &str, state: f64) {
        self.circuit_breaker_state.with_label_values(&[call_site]).set(state);
    }

    pub fn inc_bridge_retry(&self, operation: &str) {
        self.bridge_retries_total.with_label_values(&[operation]).inc();
    }

    pub fn observe_loop_iteration(&self, symbol: &str, seconds: f64) {
        self.loop_iteration_seconds.with_label_values(&[symbol]).observe(seconds);
    }

    pub fn set_confluence_confidence(&self, symbol: &str, timeframe: &str, value: f64) {
        self.confluence_confidence.with_label_values(&[symbol, timeframe]).set(value);
    }

    pub fn inc_session_generation(&self) {
        self.session_generation.add(1.0);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to create default Metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("failed to create metrics");
        assert!(metrics.render().contains("confluence_"));
    }

    #[test]
    fn test_cache_hit_counter() {
        let metrics = Metrics::new().unwrap();
        metrics.inc_cache_hit("EURUSD", "H1");
        metrics.inc_cache_hit("EURUSD", "H1");
        let output = metrics.render();
        assert!(output.contains("confluence_cache_hits_total"));
        assert!(output.contains("EURUSD"));
    }

    #[test]
    fn test_confluence_confidence_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_confluence_confidence("EURUSD", "H4", 72.5);
        let output = metrics.render();
        assert!(output.contains("confluence_confidence_percentage"));
    }

    #[test]
    fn test_session_generation_increments() {
        let metrics = Metrics::new().unwrap();
        metrics.inc_session_generation();
        metrics.inc_session_generation();
        let output = metrics.render();
        assert!(output.contains("confluence_session_generation 2"));
    }
}
