//! Synthetic-indices analyzer library (Boom/Crash, Step, Volatility/Jump
//! indices, and similar continuously-generated instruments).
//!
//! Covers the Boom/Crash, Step, and synthetic-volatility families as a
//! representative sample rather than an exhaustive set (range breaks, tick
//! behavior, and jump indices follow the same primitives and shape).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::signal::{AnalysisOutput, SignalCategory};

use super::forex::score_to_signal;
use super::{AnalysisContext, Analyzer};

fn mean(data: &[Decimal]) -> Decimal {
    if data.is_empty() {
        return Decimal::ZERO;
    }
    data.iter().sum::<Decimal>() / Decimal::from(data.len())
}

fn std_dev(data: &[Decimal]) -> Decimal {
    if data.is_empty() {
        return Decimal::ZERO;
    }
    let m = mean(data);
    let variance = data.iter().map(|v| (*v - m) * (*v - m)).sum::<Decimal>() / Decimal::from(data.len());
    variance.sqrt().unwrap_or(Decimal::ZERO)
}

/// `BoomCrashAnalysis.boom_crash_reversal_signal`: a fresh high/low against
/// a closing price diverging from its own short-term mean.
pub struct BoomCrashReversal;

impl Analyzer for BoomCrashReversal {
    fn name(&self) -> &'static str {
        "boom_crash_reversal"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 10 {
            return AnalysisOutput::default();
        }
        let highs: Vec<Decimal> = ctx.candles.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = ctx.candles.iter().map(|c| c.low).collect();
        let closes = ctx.closes();

        let recent_high = highs[n - 5..].iter().copied().fold(Decimal::MIN, Decimal::max);
        let recent_low = lows[n - 5..].iter().copied().fold(Decimal::MAX, Decimal::min);
        let prior_high = highs[n - 10..n - 5].iter().copied().fold(Decimal::MIN, Decimal::max);
        let prior_low = lows[n - 10..n - 5].iter().copied().fold(Decimal::MAX, Decimal::min);
        let recent_close_mean = mean(&closes[n - 5..]);
        let last_close = closes[n - 1];

        let score = if recent_high > prior_high && last_close < recent_close_mean {
            dec!(25)
        } else if recent_low < prior_low && last_close > recent_close_mean {
            dec!(75)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(
                SignalCategory::SyntheticRegime,
                score,
                Decimal::ONE,
                self.name(),
            )],
            explanation: None,
            metadata: None,
        }
    }
}

/// `StepIndicesAnalysis.step_direction_pattern`: up-step vs down-step count
/// over the trailing window.
pub struct StepDirectionPattern;

impl Analyzer for StepDirectionPattern {
    fn name(&self) -> &'static str {
        "step_direction_pattern"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 10 {
            return AnalysisOutput::default();
        }
        let diffs: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let upsteps = diffs.iter().filter(|d| **d > Decimal::ZERO).count();
        let downsteps = diffs.iter().filter(|d| **d < Decimal::ZERO).count();

        let score = if Decimal::from(upsteps) > Decimal::from(downsteps) * dec!(1.3) {
            dec!(75)
        } else if Decimal::from(downsteps) > Decimal::from(upsteps) * dec!(1.3) {
            dec!(25)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(
                SignalCategory::SyntheticRegime,
                score,
                Decimal::ONE,
                self.name(),
            )],
            explanation: None,
            metadata: None,
        }
    }
}

/// `StepIndicesAnalysis.step_size_consistency`: inverse coefficient of
/// variation of absolute step sizes, read as a confidence-only (non-
/// directional) regime read.
pub struct StepSizeConsistency;

impl Analyzer for StepSizeConsistency {
    fn name(&self) -> &'static str {
        "step_size_consistency"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 10 {
            return AnalysisOutput::default();
        }
        let changes: Vec<Decimal> = closes.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        let avg_change = mean(&changes);
        if avg_change == Decimal::ZERO {
            return AnalysisOutput::default();
        }
        let std_change = std_dev(&changes);
        let consistency = Decimal::ONE / (Decimal::ONE + std_change / avg_change);
        let score = (consistency * dec!(100)).min(dec!(100));

        AnalysisOutput {
            signals: vec![score_to_signal(
                SignalCategory::SyntheticRegime,
                score,
                Decimal::ONE,
                self.name(),
            )],
            explanation: None,
            metadata: None,
        }
    }
}

/// `SyntheticVolatilityAnalysis.synthetic_volatility_level`: 5-bar return
/// volatility against the trailing 15-bar volatility.
pub struct SyntheticVolatilityLevel;

impl Analyzer for SyntheticVolatilityLevel {
    fn name(&self) -> &'static str {
        "synthetic_volatility_level"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 10 {
            return AnalysisOutput::default();
        }
        let returns: Vec<Decimal> = closes
            .windows(2)
            .map(|w| if w[0] == Decimal::ZERO { Decimal::ZERO } else { ((w[1] - w[0]) / w[0]).abs() })
            .collect();
        let tail15 = &returns[returns.len().saturating_sub(15)..];
        let tail5 = &returns[returns.len().saturating_sub(5)..];

        let historical_vol = std_dev(tail15);
        if historical_vol == Decimal::ZERO {
            return AnalysisOutput::default();
        }
        let current_vol = std_dev(tail5);
        let ratio = current_vol / historical_vol;
        let score = (ratio * dec!(50)).min(dec!(100));

        AnalysisOutput {
            signals: vec![score_to_signal(
                SignalCategory::SyntheticVolatility,
                score,
                Decimal::ONE,
                self.name(),
            )],
            explanation: None,
            metadata: None,
        }
    }
}

/// `SyntheticVolatilityAnalysis.synthetic_volatility_expansion`: recent
/// 5-bar average range vs the prior 10-bar average range.
pub struct SyntheticVolatilityExpansion;

impl Analyzer for SyntheticVolatilityExpansion {
    fn name(&self) -> &'static str {
        "synthetic_volatility_expansion"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 20 {
            return AnalysisOutput::default();
        }
        let ranges: Vec<Decimal> = ctx.candles.iter().map(|c| c.high - c.low).collect();
        let recent_range = mean(&ranges[n - 5..]);
        let prior_range = mean(&ranges[n - 15..n - 5]);
        if prior_range == Decimal::ZERO {
            return AnalysisOutput::default();
        }

        let score = if recent_range > prior_range * dec!(1.5) {
            dec!(80)
        } else if recent_range < prior_range * dec!(0.7) {
            dec!(20)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(
                SignalCategory::SyntheticVolatility,
                score,
                Decimal::ONE,
                self.name(),
            )],
            explanation: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::Candle;
    use crate::domain::signal::Direction;

    fn candle(ts: i64, close: Decimal, range: Decimal) -> Candle {
        Candle {
            timestamp: ts,
            open: close,
            high: close + range / dec!(2),
            low: close - range / dec!(2),
            close,
            tick_volume: 100,
            real_volume: 0,
            spread: 1,
        }
    }

    #[test]
    fn test_step_direction_pattern_detects_up_steps() {
        let candles: Vec<Candle> = (0..10)
            .map(|i| candle(i * 1000, Decimal::from(100 + i), dec!(1)))
            .collect();
        let ctx = AnalysisContext::new("STEP100", &candles);
        let out = StepDirectionPattern.analyze(&ctx);
        assert_eq!(out.signals[0].direction, Direction::Bullish);
    }

    #[test]
    fn test_step_size_consistency_uniform_steps_score_high() {
        let candles: Vec<Candle> = (0..10)
            .map(|i| candle(i * 1000, Decimal::from(100 + i), dec!(1)))
            .collect();
        let ctx = AnalysisContext::new("STEP100", &candles);
        let out = StepSizeConsistency.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert!(out.signals[0].confidence > Decimal::ZERO || out.signals[0].direction == Direction::Neutral);
    }

    #[test]
    fn test_synthetic_volatility_expansion_insufficient_history() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i * 1000, dec!(100), dec!(1))).collect();
        let ctx = AnalysisContext::new("VOL75", &candles);
        let out = SyntheticVolatilityExpansion.analyze(&ctx);
        assert!(out.signals.is_empty());
    }
}
