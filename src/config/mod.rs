//! Configuration for the analysis engine.
//!
//! Loaded from environment variables, organized by concern: analysis
//! tuning (depth, thresholds, weights), engine cadence, bridge retry
//! policy, and observability — a per-domain sub-config split, minus the
//! broker/strategy/risk concerns a read-only analysis engine has no use
//! for.

mod observability_config;

pub use observability_config::ObservabilityEnvConfig;

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::market::timeframe::Timeframe;

/// Signal-count tier: how many analyzers/timeframes an iteration is allowed
/// to spend time on. `Fast` favors latency, `Deep` favors recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisDepth {
    Fast,
    Standard,
    Deep,
}

impl FromStr for AnalysisDepth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(AnalysisDepth::Fast),
            "standard" => Ok(AnalysisDepth::Standard),
            "deep" => Ok(AnalysisDepth::Deep),
            _ => anyhow::bail!("Invalid ANALYSIS_DEPTH: {}. Must be 'fast', 'standard', or 'deep'", s),
        }
    }
}

/// How much free text accompanies a `ConfluenceUpdate`'s derived
/// explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplanationVerbosity {
    Minimal,
    Concise,
    Detailed,
}

impl FromStr for ExplanationVerbosity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(ExplanationVerbosity::Minimal),
            "concise" => Ok(ExplanationVerbosity::Concise),
            "detailed" => Ok(ExplanationVerbosity::Detailed),
            _ => anyhow::bail!(
                "Invalid EXPLANATION_VERBOSITY: {}. Must be 'minimal', 'concise', or 'detailed'",
                s
            ),
        }
    }
}

/// Main configuration for the analysis engine and its collaborators.
///
/// Aggregates every tunable the engine and its collaborators read.
/// Field groups mirror the analysis/cadence/bridge/observability split
/// rather than a broker/strategy/risk split, since this engine has no
/// broker credentials or position-sizing rules to load.
#[derive(Debug, Clone)]
pub struct Config {
    // Analysis tuning
    pub analysis_depth: AnalysisDepth,
    pub explanation_verbosity: ExplanationVerbosity,
    pub min_pattern_confidence: Decimal,
    pub pattern_weight: Decimal,
    pub min_confidence_threshold: Decimal,
    pub timeframe_weights: HashMap<Timeframe, Decimal>,

    // Engine cadence
    pub poll_interval_secs: u64,
    pub full_refresh_interval_mins: i64,
    pub cache_staleness_factor: f64,
    pub history_days: u32,

    // Bridge retry policy
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub retry_backoff: f64,
    pub bridge_timeout_secs: u64,
    pub bridge_base_url: String,

    // Session monitor
    pub session_poll_secs: u64,

    // Symbols and timeframes under analysis. A runtime control surface
    // (e.g. `POST /start {symbol, timeframe, ...}`) is out of scope, so the
    // watched set is fixed at startup from configuration rather than
    // adjustable while running.
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,

    // Safety: must always be true; the engine never exposes order APIs
    // regardless of this flag's value, but the flag is surfaced so
    // operators can confirm the deployment's intent.
    pub analysis_only_mode: bool,

    // Observability (from ObservabilityEnvConfig, plus the reporter's own
    // push cadence — `port`/`bind_address` are carried for parity with the
    // teacher's config shape but unused by a push-only reporter).
    pub observability_enabled: bool,
    pub observability_port: u16,
    pub observability_bind_address: String,
    pub observability_interval_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// documented defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let analysis_depth = env_parse("ANALYSIS_DEPTH", "standard")
            .context("Failed to parse ANALYSIS_DEPTH")?;
        let explanation_verbosity = env_parse("EXPLANATION_VERBOSITY", "concise")
            .context("Failed to parse EXPLANATION_VERBOSITY")?;

        let min_pattern_confidence = env_decimal("MIN_PATTERN_CONFIDENCE", dec!(50));
        let pattern_weight = env_decimal("PATTERN_WEIGHT", dec!(0.60));
        let min_confidence_threshold = env_decimal("MIN_CONFIDENCE_THRESHOLD", dec!(40));

        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            analysis_depth,
            explanation_verbosity,
            min_pattern_confidence,
            pattern_weight,
            min_confidence_threshold,
            timeframe_weights: default_timeframe_weights(),

            poll_interval_secs: env_u64("POLL_INTERVAL_SECS", 30),
            full_refresh_interval_mins: env_i64("FULL_REFRESH_INTERVAL_MINS", 60),
            cache_staleness_factor: env_f64("CACHE_STALENESS_FACTOR", 1.5),
            history_days: env_u32("HISTORY_DAYS", 30),

            max_retries: env_u32("MAX_RETRIES", 3),
            retry_delay_secs: env_u64("RETRY_DELAY_SECS", 1),
            retry_backoff: env_f64("RETRY_BACKOFF", 2.0),
            bridge_timeout_secs: env_u64("BRIDGE_TIMEOUT_SECS", 10),
            bridge_base_url: env::var("BRIDGE_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:18812".to_string()),

            session_poll_secs: env_u64("SESSION_POLL_SECS", 5),

            symbols: env_csv("SYMBOLS", &["EURUSD", "GBPUSD", "USDJPY"]),
            timeframes: env_timeframes("TIMEFRAMES", &[Timeframe::H1, Timeframe::H4, Timeframe::D1]),

            analysis_only_mode: true,

            observability_enabled: observability.enabled,
            observability_port: observability.port,
            observability_bind_address: observability.bind_address,
            observability_interval_secs: env_u64("OBSERVABILITY_INTERVAL_SECS", 60),
        })
    }
}

impl Default for Config {
    /// A config with every documented default, independent of the process
    /// environment — used by tests and by callers embedding the engine as a
    /// library without going through `from_env`.
    fn default() -> Self {
        Self {
            analysis_depth: AnalysisDepth::Standard,
            explanation_verbosity: ExplanationVerbosity::Concise,
            min_pattern_confidence: dec!(50),
            pattern_weight: dec!(0.60),
            min_confidence_threshold: dec!(40),
            timeframe_weights: default_timeframe_weights(),
            poll_interval_secs: 30,
            full_refresh_interval_mins: 60,
            cache_staleness_factor: 1.5,
            history_days: 30,
            max_retries: 3,
            retry_delay_secs: 1,
            retry_backoff: 2.0,
            bridge_timeout_secs: 10,
            bridge_base_url: "http://127.0.0.1:18812".to_string(),
            session_poll_secs: 5,
            symbols: vec!["EURUSD".to_string(), "GBPUSD".to_string(), "USDJPY".to_string()],
            timeframes: vec![Timeframe::H1, Timeframe::H4, Timeframe::D1],
            analysis_only_mode: true,
            observability_enabled: true,
            observability_port: 9090,
            observability_bind_address: "127.0.0.1".to_string(),
            observability_interval_secs: 60,
        }
    }
}

/// The default per-timeframe weight table, used unless
/// `TIMEFRAME_WEIGHTS` overrides are supplied by the caller.
fn default_timeframe_weights() -> HashMap<Timeframe, Decimal> {
    use Timeframe::*;
    HashMap::from([
        (M1, dec!(0.6)),
        (M5, dec!(0.7)),
        (M15, dec!(0.8)),
        (M30, dec!(0.85)),
        (H1, dec!(0.9)),
        (H4, dec!(1.0)),
        (D1, dec!(1.1)),
        (W1, dec!(1.2)),
        (MN1, dec!(1.3)),
    ])
}

fn env_parse<T: FromStr<Err = anyhow::Error>>(key: &str, default: &str) -> Result<T> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    T::from_str(&raw)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key).ok().and_then(|v| Decimal::from_str(&v).ok()).unwrap_or(default)
}

fn env_csv(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.split(',').map(|s| s.trim().to_string()).collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

fn env_timeframes(key: &str, default: &[Timeframe]) -> Vec<Timeframe> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .split(',')
            .filter_map(|s| Timeframe::from_str(s.trim()).ok())
            .collect(),
        _ => default.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_defaults() {
        let config = Config::from_env().expect("should parse with defaults");
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.min_confidence_threshold, dec!(40));
        assert!(config.analysis_only_mode);
    }

    #[test]
    fn test_analysis_depth_parsing() {
        assert!(matches!(AnalysisDepth::from_str("fast").unwrap(), AnalysisDepth::Fast));
        assert!(matches!(AnalysisDepth::from_str("DEEP").unwrap(), AnalysisDepth::Deep));
        assert!(AnalysisDepth::from_str("invalid").is_err());
    }

    #[test]
    fn test_explanation_verbosity_parsing() {
        assert!(matches!(
            ExplanationVerbosity::from_str("detailed").unwrap(),
            ExplanationVerbosity::Detailed
        ));
        assert!(ExplanationVerbosity::from_str("invalid").is_err());
    }

    #[test]
    fn test_default_timeframe_weights_cover_all_timeframes() {
        let config = Config::default();
        assert_eq!(config.timeframe_weights.len(), 9);
        assert_eq!(config.timeframe_weights.get(&Timeframe::H4), Some(&dec!(1.0)));
    }

    #[test]
    fn test_analysis_only_mode_is_always_true() {
        assert!(Config::default().analysis_only_mode);
    }
}
