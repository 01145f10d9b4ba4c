use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// The directional lean of a [`Signal`] or aggregate result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// `+1` for bullish, `-1` for bearish, `0` for neutral — used to sign a
    /// signal's weighted contribution in the confluence engine.
    pub fn sign(&self) -> i32 {
        match self {
            Direction::Bullish => 1,
            Direction::Bearish => -1,
            Direction::Neutral => 0,
        }
    }
}

/// The analyzer family a [`Signal`] belongs to; drives the category weight
/// table in the confluence engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalCategory {
    Structure,
    Trend,
    Momentum,
    Volatility,
    Volume,
    Sessions,
    Liquidity,
    OrderBlocks,
    FairValueGaps,
    Confluence,
    MultiTimeframe,
    Candlestick,
    SyntheticVolatility,
    SyntheticRegime,
    SessionBehavior,
}

impl SignalCategory {
    /// Default multiplicative weight applied on top of a signal's own
    /// `weight` field, per the confluence engine's category table.
    pub fn default_weight(&self) -> Decimal {
        match self {
            SignalCategory::Structure => dec!(1.00),
            SignalCategory::MultiTimeframe => dec!(0.98),
            SignalCategory::Trend => dec!(0.95),
            SignalCategory::OrderBlocks => dec!(0.95),
            SignalCategory::Confluence => dec!(0.92),
            SignalCategory::Momentum => dec!(0.90),
            SignalCategory::Liquidity => dec!(0.90),
            SignalCategory::FairValueGaps => dec!(0.88),
            SignalCategory::SyntheticRegime => dec!(0.88),
            SignalCategory::Volatility => dec!(0.85),
            SignalCategory::SyntheticVolatility => dec!(0.85),
            SignalCategory::Volume => dec!(0.80),
            SignalCategory::SessionBehavior => dec!(0.80),
            SignalCategory::Sessions => dec!(0.75),
            SignalCategory::Candlestick => dec!(0.40),
        }
    }
}

/// One analyzer invocation's output datum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub category: SignalCategory,
    pub direction: Direction,
    pub confidence: Decimal,
    pub weight: Decimal,
    pub source: String,
    pub description: Option<String>,
}

impl Signal {
    pub fn new(
        category: SignalCategory,
        direction: Direction,
        confidence: Decimal,
        weight: Decimal,
        source: impl Into<String>,
    ) -> Self {
        Self {
            category,
            direction,
            confidence: confidence.clamp(Decimal::ZERO, dec!(100)),
            weight: weight.max(Decimal::ZERO),
            source: source.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn effective_weight(&self) -> Decimal {
        self.category.default_weight() * self.weight
    }

    /// Signed, weighted contribution used when ranking top factors.
    pub fn weighted_signal(&self) -> Decimal {
        Decimal::from(self.direction.sign()) * self.confidence * self.effective_weight()
    }
}

/// The output of one [`crate::application::analyzers::Analyzer`] invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub signals: Vec<Signal>,
    pub explanation: Option<String>,
    /// Free-form analyzer-specific detail (e.g. the price level a structure
    /// analyzer broke out of). Not interpreted by the confluence engine;
    /// carried through for subscribers that want the raw detail.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_and_weight_are_clamped() {
        let s = Signal::new(
            SignalCategory::Trend,
            Direction::Bullish,
            dec!(150),
            dec!(-1),
            "ema_trend",
        );
        assert_eq!(s.confidence, dec!(100));
        assert_eq!(s.weight, Decimal::ZERO);
    }

    #[test]
    fn test_effective_weight() {
        let s = Signal::new(
            SignalCategory::Candlestick,
            Direction::Bearish,
            dec!(80),
            dec!(2),
            "bearish_engulfing",
        );
        assert_eq!(s.effective_weight(), dec!(0.80));
        assert_eq!(s.weighted_signal(), dec!(-80) * dec!(0.80));
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Bullish.sign(), 1);
        assert_eq!(Direction::Bearish.sign(), -1);
        assert_eq!(Direction::Neutral.sign(), 0);
    }
}
