//! Runs confluence analysis across several timeframes and aggregates the
//! per-timeframe biases into one weighted [`MultiTimeframeResult`]. A
//! generalization of the timeframe-weighted aggregation algorithm from a
//! free-function module into a reusable service that takes its analysis
//! function as a parameter instead of importing a concrete analyzer.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::confluence::{ConfluenceEngine, DEFAULT_MIN_CONFIDENCE};
use crate::domain::confluence::{MarketBias, MultiTimeframeResult, TimeframeBias};
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::signal::Signal;

/// Per-timeframe weight table used when the caller doesn't supply overrides.
/// Thin wrapper over [`Timeframe::default_weight`] that also knows how to
/// normalize an arbitrary weight map.
pub struct TimeframeWeight;

impl TimeframeWeight {
    /// Scales `weights` to sum to `1`. Falls back to a **uniform** weight
    /// (`1 / len`) when the input sums to `<= 0`, deliberately diverging from
    /// a no-op fallback: a zero-sum weight map is a caller bug, not a signal
    /// to skip normalization, and every timeframe should still count equally
    /// rather than vanish from the aggregate.
    pub fn normalize(weights: &HashMap<Timeframe, Decimal>) -> HashMap<Timeframe, Decimal> {
        let total: Decimal = weights.values().sum();
        if total > Decimal::ZERO {
            weights.iter().map(|(tf, w)| (*tf, *w / total)).collect()
        } else if weights.is_empty() {
            HashMap::new()
        } else {
            let uniform = Decimal::ONE / Decimal::from(weights.len());
            weights.keys().map(|tf| (*tf, uniform)).collect()
        }
    }
}

/// A single timeframe's candle window, handed in by the caller (the engine
/// owns fetching via the cache; this service only aggregates).
pub struct TimeframeCandles<'a> {
    pub timeframe: Timeframe,
    pub candles: &'a [Candle],
}

/// Orchestrates confluence analysis across multiple timeframes for one
/// symbol. Stateless aside from the confluence engine it wraps; the
/// analysis function (symbol, timeframe, candles) -> signals is supplied by
/// the caller so this type has no dependency on any concrete analyzer set.
pub struct MultiTimeframeOrchestrator {
    confluence_engine: ConfluenceEngine,
}

impl Default for MultiTimeframeOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiTimeframeOrchestrator {
    pub fn new() -> Self {
        Self {
            confluence_engine: ConfluenceEngine::new(),
        }
    }

    /// Runs `analyzer` over each of `data`'s timeframes, computes a
    /// per-timeframe confluence, and aggregates into a weighted
    /// [`MultiTimeframeResult`]. Timeframes with no candles or no signals are
    /// skipped (logged by the caller); `None` is returned only when every
    /// timeframe was skipped.
    pub fn analyze_multiple_timeframes<F>(
        &self,
        symbol: &str,
        data: &[TimeframeCandles<'_>],
        weight_overrides: Option<&HashMap<Timeframe, Decimal>>,
        mut analyzer: F,
    ) -> Option<MultiTimeframeResult>
    where
        F: FnMut(&str, Timeframe, &[Candle]) -> Vec<Signal>,
    {
        if data.is_empty() {
            return None;
        }

        let mut biases = Vec::new();
        for tf_data in data {
            if tf_data.candles.is_empty() {
                continue;
            }

            let signals = analyzer(symbol, tf_data.timeframe, tf_data.candles);
            if signals.is_empty() {
                continue;
            }

            let confluence = self
                .confluence_engine
                .calculate_confluence(&signals, DEFAULT_MIN_CONFIDENCE);

            let weight = weight_overrides
                .and_then(|overrides| overrides.get(&tf_data.timeframe).copied())
                .unwrap_or_else(|| tf_data.timeframe.default_weight());

            biases.push(TimeframeBias::new(
                tf_data.timeframe,
                confluence.bullish_score,
                confluence.bearish_score,
                confluence.confidence_percentage,
                weight,
            ));
        }

        if biases.is_empty() {
            return None;
        }

        Some(Self::aggregate(symbol, biases))
    }

    /// Weighted-average aggregation of per-timeframe biases, plus the
    /// confluence-alignment metric (fraction of timeframes agreeing with the
    /// overall bias, scaled to a percentage).
    fn aggregate(symbol: &str, timeframes: Vec<TimeframeBias>) -> MultiTimeframeResult {
        let raw_weights: HashMap<Timeframe, Decimal> =
            timeframes.iter().map(|tf| (tf.timeframe, tf.weight)).collect();
        let normalized = TimeframeWeight::normalize(&raw_weights);

        let mut overall_bullish = Decimal::ZERO;
        let mut overall_bearish = Decimal::ZERO;
        let mut overall_confidence = Decimal::ZERO;
        for tf in &timeframes {
            let w = normalized.get(&tf.timeframe).copied().unwrap_or(Decimal::ZERO);
            overall_bullish += tf.bullish_score * w;
            overall_bearish += tf.bearish_score * w;
            overall_confidence += tf.confidence * w;
        }

        let overall_bias = MarketBias::from_diff(overall_bullish - overall_bearish);

        let timeframe_confluence_percent = if timeframes.len() > 1 {
            let aligned: Decimal = timeframes
                .iter()
                .map(|tf| if tf.bias == overall_bias { dec!(1.0) } else { dec!(0.5) })
                .sum();
            Some(aligned / Decimal::from(timeframes.len()) * dec!(100))
        } else {
            Some(dec!(100))
        };

        MultiTimeframeResult {
            symbol: symbol.to_string(),
            timeframes,
            overall_bullish,
            overall_bearish,
            overall_confidence,
            overall_bias,
            timeframe_confluence_percent,
        }
    }

    /// Compares a higher-timeframe aggregate against a lower-timeframe one,
    /// reporting whether their directional leans agree and how strongly.
    pub fn compute_higher_timeframe_alignment(
        higher: &MultiTimeframeResult,
        lower: &MultiTimeframeResult,
    ) -> TimeframeAlignment {
        let higher_is_bullish = higher.overall_bullish > higher.overall_bearish;
        let lower_is_bullish = lower.overall_bullish > lower.overall_bearish;
        let aligned = higher_is_bullish == lower_is_bullish;

        let bullish_gap = (higher.overall_bullish - lower.overall_bullish).abs();
        let alignment_score = if aligned {
            (dec!(80) + (dec!(20).min(bullish_gap / dec!(5)))).min(dec!(100))
        } else {
            (dec!(30) - bullish_gap / dec!(5)).max(Decimal::ZERO)
        };

        TimeframeAlignment {
            aligned,
            higher_bias: higher.overall_bias,
            lower_bias: lower.overall_bias,
            alignment_score,
            higher_confidence: higher.overall_confidence,
            lower_confidence: lower.overall_confidence,
        }
    }

    /// Picks the timeframe with the highest `confidence * (confluence / 100)`
    /// score out of an already-computed [`MultiTimeframeResult`].
    pub fn sweet_spot_timeframe(result: &MultiTimeframeResult) -> Option<(Timeframe, Decimal)> {
        let confluence_factor = result.timeframe_confluence_percent.unwrap_or(Decimal::ZERO) / dec!(100);
        result
            .timeframes
            .iter()
            .map(|tf| (tf.timeframe, tf.confidence * confluence_factor))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Result of comparing a higher-timeframe bias against a lower-timeframe one.
#[derive(Debug, Clone)]
pub struct TimeframeAlignment {
    pub aligned: bool,
    pub higher_bias: MarketBias,
    pub lower_bias: MarketBias,
    pub alignment_score: Decimal,
    pub higher_confidence: Decimal,
    pub lower_confidence: Decimal,
}
