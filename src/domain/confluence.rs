use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::market::timeframe::Timeframe;
use crate::domain::signal::Signal;

/// Coarse market-bias label, thresholded from the bullish/bearish
/// differential in [`ConfluenceResult`] and [`MultiTimeframeResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketBias {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl MarketBias {
    /// Applies the diff-threshold table shared by the confluence engine and
    /// the multi-timeframe orchestrator: `|diff| < 10` -> Neutral,
    /// `< 25` -> Bullish/Bearish, else Strong Bullish/Strong Bearish. The
    /// boundaries sit inside the upper band, so `diff == 10` is already
    /// Bullish and `diff == 25` is already Strong Bullish.
    pub fn from_diff(diff: Decimal) -> Self {
        use rust_decimal_macros::dec;
        if diff >= dec!(25) {
            MarketBias::StrongBullish
        } else if diff >= dec!(10) {
            MarketBias::Bullish
        } else if diff <= dec!(-25) {
            MarketBias::StrongBearish
        } else if diff <= dec!(-10) {
            MarketBias::Bearish
        } else {
            MarketBias::Neutral
        }
    }
}

impl fmt::Display for MarketBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketBias::StrongBullish => "Strong Bullish",
            MarketBias::Bullish => "Bullish",
            MarketBias::Neutral => "Neutral",
            MarketBias::Bearish => "Bearish",
            MarketBias::StrongBearish => "Strong Bearish",
        };
        write!(f, "{}", s)
    }
}

/// Counts of retained signals by direction, used for the neutral-probability
/// formula and for reporting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SignalCounts {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl SignalCounts {
    pub fn total(&self) -> usize {
        self.bullish + self.bearish + self.neutral
    }
}

/// A top-ranked contributing signal, carried alongside its weighted score for
/// explanation surfacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorContribution {
    pub signal: Signal,
    pub weighted_score: Decimal,
}

/// The weighted aggregation of a list of [`Signal`]s into a normalized
/// bullish/bearish/neutral triplet with a derived confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceResult {
    pub bullish_score: Decimal,
    pub bearish_score: Decimal,
    pub neutral_probability: Decimal,
    pub confidence_percentage: Decimal,
    pub market_bias: MarketBias,
    pub signal_counts: SignalCounts,
    pub top_factors: Vec<FactorContribution>,
    pub weighted_signals: Vec<Signal>,
}

impl ConfluenceResult {
    pub fn neutral_empty() -> Self {
        use rust_decimal_macros::dec;
        Self {
            bullish_score: Decimal::ZERO,
            bearish_score: Decimal::ZERO,
            neutral_probability: dec!(100),
            confidence_percentage: Decimal::ZERO,
            market_bias: MarketBias::Neutral,
            signal_counts: SignalCounts::default(),
            top_factors: Vec::new(),
            weighted_signals: Vec::new(),
        }
    }
}

/// Per-timeframe [`ConfluenceResult`] plus the weight it carries into
/// cross-timeframe aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeBias {
    pub timeframe: Timeframe,
    pub bullish_score: Decimal,
    pub bearish_score: Decimal,
    pub confidence: Decimal,
    pub weight: Decimal,
    pub bias: MarketBias,
}

impl TimeframeBias {
    pub fn new(
        timeframe: Timeframe,
        bullish_score: Decimal,
        bearish_score: Decimal,
        confidence: Decimal,
        weight: Decimal,
    ) -> Self {
        let bias = MarketBias::from_diff(bullish_score - bearish_score);
        Self {
            timeframe,
            bullish_score,
            bearish_score,
            confidence,
            weight,
            bias,
        }
    }
}

/// Collection of [`TimeframeBias`] plus their weighted aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiTimeframeResult {
    pub symbol: String,
    pub timeframes: Vec<TimeframeBias>,
    pub overall_bullish: Decimal,
    pub overall_bearish: Decimal,
    pub overall_confidence: Decimal,
    pub overall_bias: MarketBias,
    /// Fraction of timeframes whose bias matches `overall_bias`, as a
    /// percentage; `None` only when `timeframes` is empty.
    pub timeframe_confluence_percent: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bias_thresholds() {
        assert_eq!(MarketBias::from_diff(dec!(30)), MarketBias::StrongBullish);
        assert_eq!(MarketBias::from_diff(dec!(15)), MarketBias::Bullish);
        assert_eq!(MarketBias::from_diff(dec!(5)), MarketBias::Neutral);
        assert_eq!(MarketBias::from_diff(dec!(-5)), MarketBias::Neutral);
        assert_eq!(MarketBias::from_diff(dec!(-15)), MarketBias::Bearish);
        assert_eq!(MarketBias::from_diff(dec!(-30)), MarketBias::StrongBearish);
    }

    #[test]
    fn test_bias_boundaries_are_inclusive() {
        assert_eq!(MarketBias::from_diff(dec!(25)), MarketBias::StrongBullish);
        assert_eq!(MarketBias::from_diff(dec!(10)), MarketBias::Bullish);
        assert_eq!(MarketBias::from_diff(dec!(-10)), MarketBias::Bearish);
        assert_eq!(MarketBias::from_diff(dec!(-25)), MarketBias::StrongBearish);
    }

    #[test]
    fn test_neutral_empty_sums_to_100() {
        let r = ConfluenceResult::neutral_empty();
        assert_eq!(r.bullish_score + r.bearish_score + r.neutral_probability, dec!(100));
        assert_eq!(r.market_bias, MarketBias::Neutral);
    }
}
