//! General-purpose analyzers for indices, commodities, crypto, and any
//! symbol that doesn't fit the Forex or synthetic catalogs.
//!
//! Keeps the asset-agnostic detectors that don't already have a
//! Forex-specific equivalent (breakout, pullback, consolidation, range
//! expansion, volatility mean-reversion, volume profile).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::market::indicators::{cci, obv, roc, williams_percent_r};
use crate::domain::signal::{AnalysisOutput, SignalCategory};

use super::{AnalysisContext, Analyzer};
use super::forex::score_to_signal;

fn mean(data: &[Decimal]) -> Decimal {
    if data.is_empty() {
        return Decimal::ZERO;
    }
    data.iter().sum::<Decimal>() / Decimal::from(data.len())
}

fn highs(ctx: &AnalysisContext<'_>) -> Vec<Decimal> {
    ctx.candles.iter().map(|c| c.high).collect()
}

fn lows(ctx: &AnalysisContext<'_>) -> Vec<Decimal> {
    ctx.candles.iter().map(|c| c.low).collect()
}

fn volumes(ctx: &AnalysisContext<'_>) -> Vec<Decimal> {
    ctx.candles.iter().map(|c| Decimal::from(c.tick_volume)).collect()
}

/// `_detect_breakout`: close beyond the prior 19-bar high/low.
pub struct BreakoutDetection;

impl Analyzer for BreakoutDetection {
    fn name(&self) -> &'static str {
        "breakout_detection"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 20 {
            return AnalysisOutput::default();
        }
        let lookback = &ctx.candles[n - 20..n - 1];
        let recent_high = lookback.iter().map(|c| c.high).fold(Decimal::MIN, Decimal::max);
        let recent_low = lookback.iter().map(|c| c.low).fold(Decimal::MAX, Decimal::min);
        let current_close = ctx.candles[n - 1].close;

        let score = if current_close > recent_high {
            dec!(75)
        } else if current_close < recent_low {
            dec!(25)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Structure, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_detect_pullback`: price retracing to the midpoint of the last 30-bar
/// range, read as a continuation setup rather than a directional lean.
pub struct PullbackDetection;

impl Analyzer for PullbackDetection {
    fn name(&self) -> &'static str {
        "pullback_detection"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 30 {
            return AnalysisOutput::default();
        }
        let window = &ctx.candles[n - 30..];
        let recent_high = window.iter().map(|c| c.high).fold(Decimal::MIN, Decimal::max);
        let recent_low = window.iter().map(|c| c.low).fold(Decimal::MAX, Decimal::min);
        let mid_point = (recent_high + recent_low) / dec!(2);

        let last = &ctx.candles[n - 1];
        let current_price = (last.open + last.close) / dec!(2);
        let range = recent_high - recent_low;

        let score = if range > Decimal::ZERO && (current_price - mid_point).abs() < range * dec!(0.1) {
            dec!(70)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Structure, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_detect_consolidation`: current bar's range well below the trailing
/// 20-bar average range.
pub struct ConsolidationDetection;

impl Analyzer for ConsolidationDetection {
    fn name(&self) -> &'static str {
        "consolidation_detection"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 20 {
            return AnalysisOutput::default();
        }
        let recent = &ctx.candles[n - 20..];
        let ranges: Vec<Decimal> = recent.iter().map(|c| c.high - c.low).collect();
        let avg_range = mean(&ranges);
        let current_range = *ranges.last().unwrap();

        let score = if avg_range > Decimal::ZERO && current_range < avg_range * dec!(0.6) {
            dec!(70)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Structure, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_range_expansion_analysis`: current bar's range vs the trailing 20-bar
/// average range.
pub struct RangeExpansion;

impl Analyzer for RangeExpansion {
    fn name(&self) -> &'static str {
        "range_expansion"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 20 {
            return AnalysisOutput::default();
        }
        let recent = &ctx.candles[n - 20..];
        let ranges: Vec<Decimal> = recent.iter().map(|c| c.high - c.low).collect();
        let avg_range = mean(&ranges);
        let current_range = ctx.candles[n - 1].high - ctx.candles[n - 1].low;

        let score = if avg_range == Decimal::ZERO {
            dec!(50)
        } else if current_range > avg_range * dec!(1.3) {
            dec!(70)
        } else if current_range < avg_range * dec!(0.7) {
            dec!(30)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Volatility, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_volatility_mean_reversion`: recent 10-bar average range vs the prior
/// 20-bar average range.
pub struct VolatilityMeanReversion;

impl Analyzer for VolatilityMeanReversion {
    fn name(&self) -> &'static str {
        "volatility_mean_reversion"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 30 {
            return AnalysisOutput::default();
        }
        let ranges: Vec<Decimal> = ctx.candles.iter().map(|c| c.high - c.low).collect();
        let recent = mean(&ranges[n - 10..]);
        let historical = mean(&ranges[n - 30..n - 10]);

        let score = if historical == Decimal::ZERO {
            dec!(50)
        } else if recent > historical * dec!(1.5) {
            dec!(70)
        } else if recent < historical * dec!(0.7) {
            dec!(30)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Volatility, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `_volume_profile_analysis`: recent 10-bar average volume vs the prior
/// 20-bar average volume.
pub struct VolumeProfile;

impl Analyzer for VolumeProfile {
    fn name(&self) -> &'static str {
        "volume_profile"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 30 {
            return AnalysisOutput::default();
        }
        let volumes: Vec<Decimal> = ctx.candles.iter().map(|c| Decimal::from(c.tick_volume)).collect();
        let recent = mean(&volumes[n - 10..]);
        let historical = mean(&volumes[n - 30..n - 10]);

        let score = if historical == Decimal::ZERO {
            dec!(50)
        } else if recent > historical * dec!(1.2) {
            dec!(70)
        } else if recent < historical * dec!(0.8) {
            dec!(30)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Volume, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `VolumeAnalysis.obv_trend`: on-balance volume vs its own 10-period SMA,
/// read as whether volume is confirming or diverging from price.
pub struct ObvTrend;

impl Analyzer for ObvTrend {
    fn name(&self) -> &'static str {
        "obv_trend"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 30 {
            return AnalysisOutput::default();
        }
        let closes = ctx.closes();
        let vols = volumes(ctx);
        let obv_vals = obv(&closes, &vols);
        let recent_avg = mean(&obv_vals[n - 10..]);
        let current = *obv_vals.last().unwrap();

        let score = if recent_avg == Decimal::ZERO {
            dec!(50)
        } else if current > recent_avg * dec!(1.05) {
            dec!(70)
        } else if current < recent_avg * dec!(0.95) {
            dec!(30)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Volume, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `MomentumAnalysis.cci_extreme`: CCI(20) beyond the +/-100 overbought /
/// oversold bands.
pub struct CciExtreme;

impl Analyzer for CciExtreme {
    fn name(&self) -> &'static str {
        "cci_extreme"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        if ctx.candles.len() < 25 {
            return AnalysisOutput::default();
        }
        let cci_vals = cci(&highs(ctx), &lows(ctx), &ctx.closes(), 20);
        let current = *cci_vals.last().unwrap();

        let score = if current > dec!(100) {
            dec!(20)
        } else if current < dec!(-100) {
            dec!(80)
        } else {
            dec!(50) + current / dec!(4)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(
                SignalCategory::Momentum,
                score.clamp(Decimal::ZERO, dec!(100)),
                Decimal::ONE,
                self.name(),
            )],
            explanation: None,
            metadata: None,
        }
    }
}

/// `MomentumAnalysis.williams_r_extreme`: Williams %R(14) beyond -20/-80.
pub struct WilliamsRExtreme;

impl Analyzer for WilliamsRExtreme {
    fn name(&self) -> &'static str {
        "williams_r_extreme"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        if ctx.candles.len() < 20 {
            return AnalysisOutput::default();
        }
        let vals = williams_percent_r(&highs(ctx), &lows(ctx), &ctx.closes(), 14);
        let current = *vals.last().unwrap();

        // Williams %R ranges -100 (oversold) to 0 (overbought).
        let score = if current > dec!(-20) {
            dec!(15)
        } else if current < dec!(-80) {
            dec!(85)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Momentum, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `MomentumAnalysis.roc_momentum`: rate-of-change(12) sign and magnitude.
pub struct RocMomentum;

impl Analyzer for RocMomentum {
    fn name(&self) -> &'static str {
        "roc_momentum"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        if ctx.candles.len() < 20 {
            return AnalysisOutput::default();
        }
        let vals = roc(&ctx.closes(), 12);
        let current = *vals.last().unwrap();

        let score = (dec!(50) + current * dec!(5)).clamp(Decimal::ZERO, dec!(100));

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Momentum, score, Decimal::ONE, self.name())],
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

    fn flat_candles(n: usize, price: f64, range: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = Decimal::try_from(price).unwrap();
                Candle {
                    timestamp: i as i64 * 60_000,
                    open: close,
                    high: close + Decimal::try_from(range / 2.0).unwrap(),
                    low: close - Decimal::try_from(range / 2.0).unwrap(),
                    close,
                    tick_volume: 100,
                    real_volume: 0,
                    spread: 1,
                }
            })
            .collect()
    }

    #[test]
    fn test_breakout_above_recent_high_is_bullish() {
        let mut candles = flat_candles(20, 1.0, 0.01);
        candles[19].close = dec!(1.5);
        let ctx = AnalysisContext::new("US500", &candles);
        let out = BreakoutDetection.analyze(&ctx);
        assert_eq!(out.signals[0].direction, Direction::Bullish);
    }

    #[test]
    fn test_consolidation_detects_tight_range() {
        let mut candles = flat_candles(20, 1.0, 0.1);
        let last = candles.len() - 1;
        candles[last].high = dec!(1.01);
        candles[last].low = dec!(0.99);
        let ctx = AnalysisContext::new("XAUUSD", &candles);
        let out = ConsolidationDetection.analyze(&ctx);
        assert_eq!(out.signals[0].direction, Direction::Bullish);
    }

    #[test]
    fn test_volume_profile_insufficient_history_is_empty() {
        let candles = flat_candles(10, 1.0, 0.01);
        let ctx = AnalysisContext::new("BTCUSD", &candles);
        let out = VolumeProfile.analyze(&ctx);
        assert!(out.signals.is_empty());
    }

    fn rising_candles(n: usize, start: f64, step: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = Decimal::try_from(start + step * i as f64).unwrap();
                Candle {
                    timestamp: i as i64 * 60_000,
                    open: close - dec!(0.1),
                    high: close + dec!(0.2),
                    low: close - dec!(0.2),
                    close,
                    tick_volume: 100 + i as u64,
                    real_volume: 0,
                    spread: 1,
                }
            })
            .collect()
    }

    #[test]
    fn test_obv_trend_insufficient_history_is_empty() {
        let candles = flat_candles(10, 1.0, 0.01);
        let ctx = AnalysisContext::new("US500", &candles);
        assert!(ObvTrend.analyze(&ctx).signals.is_empty());
    }

    #[test]
    fn test_obv_trend_rising_volume_and_price_is_bullish() {
        let candles = rising_candles(40, 1.0, 0.01);
        let ctx = AnalysisContext::new("US500", &candles);
        let out = ObvTrend.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].category, SignalCategory::Volume);
    }

    #[test]
    fn test_cci_extreme_strong_uptrend_reads_overbought() {
        // A sustained uptrend pushes CCI past +100; the analyzer reads that
        // as overbought (mean-reversion bearish lean), not a bullish signal.
        let candles = rising_candles(30, 1.0, 0.02);
        let ctx = AnalysisContext::new("US500", &candles);
        let out = CciExtreme.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].direction, Direction::Bearish);
    }

    #[test]
    fn test_williams_r_uptrend_reads_overbought() {
        let candles = rising_candles(25, 1.0, 0.02);
        let ctx = AnalysisContext::new("US500", &candles);
        let out = WilliamsRExtreme.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
    }

    #[test]
    fn test_roc_momentum_uptrend_is_bullish() {
        let candles = rising_candles(25, 1.0, 0.05);
        let ctx = AnalysisContext::new("US500", &candles);
        let out = RocMomentum.analyze(&ctx);
        assert_eq!(out.signals[0].direction, Direction::Bullish);
    }
}
