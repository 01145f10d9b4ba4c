//! Structure and price-action pattern detectors.
//!
//! A representative sample (trend structure, rectangle consolidation,
//! bullish/bearish flag) spanning trend structures, support/resistance,
//! continuation structures, and breakout/failure patterns, each emitting a
//! direct confidence score instead of the 0-100-midpoint convention used by
//! the indicator families, since these patterns already carry an explicit
//! pattern_type.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::signal::{AnalysisOutput, Direction, Signal, SignalCategory};

use super::{AnalysisContext, Analyzer};

fn mean(data: &[Decimal]) -> Decimal {
    if data.is_empty() {
        return Decimal::ZERO;
    }
    data.iter().sum::<Decimal>() / Decimal::from(data.len())
}

/// `_detect_uptrend_structures` / `_detect_downtrend_structures`: three
/// consecutive higher (or lower) highs, read as a Structure-category signal.
pub struct HigherHighsLowerLows;

impl Analyzer for HigherHighsLowerLows {
    fn name(&self) -> &'static str {
        "higher_highs_lower_lows"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 5 {
            return AnalysisOutput::default();
        }
        let highs: Vec<Decimal> = ctx.candles.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = ctx.candles.iter().map(|c| c.low).collect();

        let mut signals = Vec::new();
        if highs[n - 1] > highs[n - 2] && highs[n - 2] > highs[n - 3] {
            signals.push(Signal::new(SignalCategory::Structure, Direction::Bullish, dec!(75), Decimal::ONE, self.name())
                .with_description("Higher Highs: uptrend with momentum"));
        }
        if highs[n - 1] < highs[n - 2] && highs[n - 2] < highs[n - 3] {
            signals.push(Signal::new(SignalCategory::Structure, Direction::Bearish, dec!(75), Decimal::ONE, self.name())
                .with_description("Lower Highs: downtrend with momentum"));
        }
        if lows[n - 1] > lows[n - 2] && lows[n - 2] > lows[n - 3] {
            signals.push(Signal::new(SignalCategory::Structure, Direction::Bullish, dec!(70), Decimal::ONE, self.name())
                .with_description("Higher Lows: uptrend with support building"));
        }
        if lows[n - 1] < lows[n - 2] && lows[n - 2] < lows[n - 3] {
            signals.push(Signal::new(SignalCategory::Structure, Direction::Bearish, dec!(70), Decimal::ONE, self.name())
                .with_description("Lower Lows: downtrend with resistance failing"));
        }

        AnalysisOutput { signals, explanation: None, metadata: None }
    }
}

/// `_detect_uptrend_structures` / `_detect_downtrend_structures`: trailing
/// 5-bar range expanding by 20%+ against the prior 5-bar range.
pub struct AcceleratingTrend;

impl Analyzer for AcceleratingTrend {
    fn name(&self) -> &'static str {
        "accelerating_trend"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 10 {
            return AnalysisOutput::default();
        }
        let ranges: Vec<Decimal> = ctx.candles.iter().map(|c| c.high - c.low).collect();
        let recent = mean(&ranges[n - 5..]);
        let earlier = mean(&ranges[n - 10..n - 5]);
        if earlier == Decimal::ZERO || recent <= earlier * dec!(1.2) {
            return AnalysisOutput::default();
        }

        let closes = ctx.closes();
        let direction = if closes[n - 1] >= closes[n - 5] { Direction::Bullish } else { Direction::Bearish };

        AnalysisOutput {
            signals: vec![Signal::new(SignalCategory::Structure, direction, dec!(80), Decimal::ONE, self.name())
                .with_description("Accelerating trend: range expanding with increasing intensity")],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_detect_rectangle_structures`: 3+ touches of both the upper and lower
/// boundary of a 20-bar range, read as a neutral consolidation-awaiting-
/// breakout structure.
pub struct RectangleConsolidation;

impl Analyzer for RectangleConsolidation {
    fn name(&self) -> &'static str {
        "rectangle_consolidation"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 10 {
            return AnalysisOutput::default();
        }
        let start = n.saturating_sub(20);
        let highs = &ctx.candles[start..];
        let lows = &ctx.candles[start..];

        let high_level = highs.iter().map(|c| c.high).fold(Decimal::MIN, Decimal::max);
        let low_level = lows.iter().map(|c| c.low).fold(Decimal::MAX, Decimal::min);

        let upper_touches = highs.iter().filter(|c| c.high > high_level * dec!(0.99)).count();
        let lower_touches = lows.iter().filter(|c| c.low < low_level * dec!(1.01)).count();

        if upper_touches >= 3 && lower_touches >= 3 {
            return AnalysisOutput {
                signals: vec![Signal::new(SignalCategory::Structure, Direction::Neutral, dec!(72), Decimal::ONE, self.name())
                    .with_description("Rectangle consolidation: balanced range awaiting breakout")],
                explanation: None,
                metadata: None,
            };
        }

        AnalysisOutput::default()
    }
}

/// `_detect_flag_structures`: a directional run of 5+ same-direction
/// candles followed by a tight 5-bar consolidation.
pub struct FlagContinuation;

impl Analyzer for FlagContinuation {
    fn name(&self) -> &'static str {
        "flag_continuation"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 20 {
            return AnalysisOutput::default();
        }
        let tail = &ctx.candles[n - 20..];
        let up_candles = tail.iter().filter(|c| c.close > c.open).count();
        let down_candles = tail.iter().filter(|c| c.close < c.open).count();

        let closes: Vec<Decimal> = tail.iter().map(|c| c.close).collect();
        let last5 = &closes[15..];
        let mean5 = mean(last5);
        if mean5 == Decimal::ZERO {
            return AnalysisOutput::default();
        }
        let variance = last5.iter().map(|c| (*c - mean5) * (*c - mean5)).sum::<Decimal>() / Decimal::from(last5.len());
        let std5 = variance.sqrt().unwrap_or(Decimal::ZERO);
        let consolidation_tightness = std5 / mean5;

        if up_candles >= 5 {
            let overall_trend = (closes[19] - closes[4]) / closes[4];
            if consolidation_tightness < dec!(0.005) && overall_trend > dec!(0.01) {
                return AnalysisOutput {
                    signals: vec![Signal::new(SignalCategory::Structure, Direction::Bullish, dec!(72), Decimal::ONE, self.name())
                        .with_description("Bullish flag: continuation pattern in uptrend")],
                    explanation: None,
                    metadata: None,
                };
            }
        }
        if down_candles >= 5 {
            let overall_trend = (closes[4] - closes[19]) / closes[4];
            if consolidation_tightness < dec!(0.005) && overall_trend > dec!(0.01) {
                return AnalysisOutput {
                    signals: vec![Signal::new(SignalCategory::Structure, Direction::Bearish, dec!(72), Decimal::ONE, self.name())
                        .with_description("Bearish flag: continuation pattern in downtrend")],
                    explanation: None,
                    metadata: None,
                };
            }
        }

        AnalysisOutput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::Candle;

    fn candle(ts: i64, o: Decimal, h: Decimal, l: Decimal, c: Decimal) -> Candle {
        Candle { timestamp: ts, open: o, high: h, low: l, close: c, tick_volume: 100, real_volume: 0, spread: 1 }
    }

    #[test]
    fn test_higher_highs_detected() {
        let candles = vec![
            candle(0, dec!(1.0), dec!(1.05), dec!(0.95), dec!(1.0)),
            candle(1, dec!(1.0), dec!(1.10), dec!(0.95), dec!(1.05)),
            candle(2, dec!(1.05), dec!(1.15), dec!(0.95), dec!(1.08)),
            candle(3, dec!(1.08), dec!(1.20), dec!(0.95), dec!(1.10)),
            candle(4, dec!(1.10), dec!(1.25), dec!(0.95), dec!(1.12)),
        ];
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = HigherHighsLowerLows.analyze(&ctx);
        assert!(out.signals.iter().any(|s| s.direction == Direction::Bullish));
    }

    #[test]
    fn test_rectangle_requires_sufficient_history() {
        let candles = vec![candle(0, dec!(1.0), dec!(1.01), dec!(0.99), dec!(1.0)); 5];
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = RectangleConsolidation.analyze(&ctx);
        assert!(out.signals.is_empty());
    }

    #[test]
    fn test_flag_continuation_insufficient_history_is_empty() {
        let candles = vec![candle(0, dec!(1.0), dec!(1.01), dec!(0.99), dec!(1.0)); 10];
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = FlagContinuation.analyze(&ctx);
        assert!(out.signals.is_empty());
    }
}
