//! Aggregates analyzer signals into a [`ConfluenceResult`]. A direct port of
//! the category-weighted scoring algorithm, generalized from `f64` to
//! `Decimal` and from a free-function module to a reusable, stateless
//! service.

use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::confluence::{ConfluenceResult, FactorContribution, MarketBias, SignalCounts};
use crate::domain::signal::{Direction, Signal};

/// Below this confidence a signal is dropped before scoring, matching the
/// source's `min_confidence` filter.
pub const DEFAULT_MIN_CONFIDENCE: Decimal = dec!(40);

/// Stateless aggregator: same weighting table and formulas for every call,
/// so one instance is shared across symbols and timeframes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfluenceEngine;

impl ConfluenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Runs the full aggregation pipeline over `signals`, dropping anything
    /// below `min_confidence`.
    pub fn calculate_confluence(&self, signals: &[Signal], min_confidence: Decimal) -> ConfluenceResult {
        let valid: Vec<&Signal> = signals
            .iter()
            .filter(|s| s.confidence >= min_confidence)
            .collect();

        if valid.is_empty() {
            return ConfluenceResult::neutral_empty();
        }

        let bullish: Vec<&Signal> = valid
            .iter()
            .copied()
            .filter(|s| s.direction == Direction::Bullish)
            .collect();
        let bearish: Vec<&Signal> = valid
            .iter()
            .copied()
            .filter(|s| s.direction == Direction::Bearish)
            .collect();
        let neutral: Vec<&Signal> = valid
            .iter()
            .copied()
            .filter(|s| s.direction == Direction::Neutral)
            .collect();

        let bullish_score = Self::compute_score(&bullish);
        let bearish_score = Self::compute_score(&bearish);
        let neutral_probability = Self::compute_neutral(neutral.len(), valid.len());
        let confidence_percentage = Self::compute_confidence(&valid);
        let top_factors = Self::top_factors(&valid, 5);
        let market_bias = Self::determine_bias(bullish_score, bearish_score, confidence_percentage);

        let mut result = ConfluenceResult {
            bullish_score,
            bearish_score,
            neutral_probability,
            confidence_percentage,
            market_bias,
            signal_counts: SignalCounts {
                bullish: bullish.len(),
                bearish: bearish.len(),
                neutral: neutral.len(),
            },
            top_factors,
            weighted_signals: valid.iter().map(|s| (*s).clone()).collect(),
        };
        Self::normalize(&mut result);
        result
    }

    /// Average of `confidence * effective_weight` across `signals`; `0` when
    /// empty.
    fn compute_score(signals: &[&Signal]) -> Decimal {
        if signals.is_empty() {
            return Decimal::ZERO;
        }
        let sum: Decimal = signals.iter().map(|s| s.confidence * s.effective_weight()).sum();
        sum / Decimal::from(signals.len())
    }

    /// `(neutral_count / total) * 50`, capped at 50 — neutral signals can
    /// never dominate a bullish/bearish call on their own.
    fn compute_neutral(neutral_count: usize, total: usize) -> Decimal {
        if total == 0 {
            return dec!(100);
        }
        let ratio = Decimal::from(neutral_count) / Decimal::from(total) * dec!(50);
        ratio.min(dec!(50))
    }

    /// Blends average confidence with a signal-count factor (diminishing
    /// returns past 20 signals) and a category-diversity factor (diminishing
    /// returns past 8 distinct categories).
    fn compute_confidence(signals: &[&Signal]) -> Decimal {
        if signals.is_empty() {
            return Decimal::ZERO;
        }
        let avg_confidence: Decimal =
            signals.iter().map(|s| s.confidence).sum::<Decimal>() / Decimal::from(signals.len());

        let count_factor = (Decimal::from(signals.len()) / dec!(20)).min(Decimal::ONE);

        let categories: HashSet<_> = signals.iter().map(|s| s.category).collect();
        let diversity_factor = (Decimal::from(categories.len()) / dec!(8)).min(Decimal::ONE);

        let confidence = avg_confidence * (dec!(0.5) + dec!(0.25) * count_factor + dec!(0.25) * diversity_factor);
        confidence.min(dec!(100))
    }

    /// Ranks signals by `confidence * effective_weight` and keeps the top
    /// `top_n`.
    fn top_factors(signals: &[&Signal], top_n: usize) -> Vec<FactorContribution> {
        let mut scored: Vec<FactorContribution> = signals
            .iter()
            .map(|s| FactorContribution {
                signal: (*s).clone(),
                weighted_score: s.confidence * s.effective_weight(),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.weighted_score
                .partial_cmp(&a.weighted_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_n);
        scored
    }

    fn determine_bias(bullish: Decimal, bearish: Decimal, confidence: Decimal) -> MarketBias {
        if confidence < dec!(30) {
            return MarketBias::Neutral;
        }
        MarketBias::from_diff(bullish - bearish)
    }

    /// Rescales `bullish_score + bearish_score + neutral_probability` to sum
    /// to ~100, in place. A no-op when the sum is already zero (the
    /// `neutral_empty` shape).
    fn normalize(result: &mut ConfluenceResult) {
        let total = result.bullish_score + result.bearish_score + result.neutral_probability;
        if total > Decimal::ZERO {
            let factor = dec!(100) / total;
            result.bullish_score *= factor;
            result.bearish_score *= factor;
            result.neutral_probability *= factor;
        }
    }

    /// Weighted-average merge of several confluence results (e.g. across
    /// timeframes), re-deriving bias from the merged scores and keeping the
    /// union of top factors, re-ranked. `weights` defaults to uniform when
    /// `None`; panics-free on an empty `confluences` slice is the caller's
    /// responsibility (mirrors the source's `ValueError` by returning
    /// `neutral_empty()` instead of raising).
    pub fn merge_confluences(
        &self,
        confluences: &[ConfluenceResult],
        weights: Option<&[Decimal]>,
    ) -> ConfluenceResult {
        if confluences.is_empty() {
            return ConfluenceResult::neutral_empty();
        }

        let owned_weights: Vec<Decimal>;
        let weights: &[Decimal] = match weights {
            Some(w) if w.len() == confluences.len() => w,
            _ => {
                owned_weights = vec![Decimal::ONE; confluences.len()];
                &owned_weights
            }
        };

        let total_weight: Decimal = weights.iter().sum();
        let norm_weights: Vec<Decimal> = if total_weight > Decimal::ZERO {
            weights.iter().map(|w| w / total_weight).collect()
        } else {
            vec![Decimal::ONE / Decimal::from(confluences.len()); confluences.len()]
        };

        let mut bullish_avg = Decimal::ZERO;
        let mut bearish_avg = Decimal::ZERO;
        let mut neutral_avg = Decimal::ZERO;
        let mut confidence_avg = Decimal::ZERO;
        for (c, w) in confluences.iter().zip(norm_weights.iter()) {
            bullish_avg += c.bullish_score * w;
            bearish_avg += c.bearish_score * w;
            neutral_avg += c.neutral_probability * w;
            confidence_avg += c.confidence_percentage * w;
        }

        let mut all_factors: Vec<FactorContribution> =
            confluences.iter().flat_map(|c| c.top_factors.clone()).collect();
        all_factors.sort_by(|a, b| {
            b.weighted_score
                .partial_cmp(&a.weighted_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all_factors.truncate(5);

        let market_bias = Self::determine_bias(bullish_avg, bearish_avg, confidence_avg);

        let mut counts = SignalCounts::default();
        for c in confluences {
            counts.bullish += c.signal_counts.bullish;
            counts.bearish += c.signal_counts.bearish;
            counts.neutral += c.signal_counts.neutral;
        }

        ConfluenceResult {
            bullish_score: bullish_avg,
            bearish_score: bearish_avg,
            neutral_probability: neutral_avg,
            confidence_percentage: confidence_avg,
            market_bias,
            signal_counts: counts,
            top_factors: all_factors,
            weighted_signals: Vec::new(),
        }
    }
}

/// Clamps a ratio-type `Decimal` into an `f64` for logging/metrics contexts
/// where a lossy conversion is acceptable.
pub fn to_f64_lossy(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
