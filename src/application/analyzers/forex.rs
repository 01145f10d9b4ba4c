//! Forex (continuous FX/CFD) analyzer library.
//!
//! A representative, fully-functional sample per family (trend, momentum,
//! volatility, volume, sessions, order blocks, fair value gaps, liquidity)
//! rather than an exhaustive catalog. Every method here returns a raw
//! 0-100 score before being folded into a [`Signal`] by [`score_to_signal`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::market::indicators::{adx, atr, bollinger_bands, ema, macd, sma, stochastic};
use crate::domain::market::sessions::TradingSession;
use crate::domain::signal::{AnalysisOutput, Direction, Signal, SignalCategory};

use super::{AnalysisContext, Analyzer};

/// Converts a source-convention 0-100 score (50 = neutral) into a `Signal`.
/// Distance from the neutral midpoint becomes confidence: a score of 100 or
/// 0 yields full confidence, a score near 50 yields almost none.
pub(crate) fn score_to_signal(category: SignalCategory, score: Decimal, weight: Decimal, source: &'static str) -> Signal {
    let diff = score - dec!(50);
    let direction = if diff > Decimal::ZERO {
        Direction::Bullish
    } else if diff < Decimal::ZERO {
        Direction::Bearish
    } else {
        Direction::Neutral
    };
    let confidence = (diff.abs() * dec!(2)).min(dec!(100));
    Signal::new(category, direction, confidence, weight, source)
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

fn mean(data: &[Decimal]) -> Decimal {
    if data.is_empty() {
        return Decimal::ZERO;
    }
    data.iter().sum::<Decimal>() / Decimal::from(data.len())
}

/// `TrendAnalysis.moving_average_crossover`: SMA(20) vs SMA(50).
pub struct MovingAverageCrossover;

impl Analyzer for MovingAverageCrossover {
    fn name(&self) -> &'static str {
        "ma_crossover"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 50 {
            return AnalysisOutput::default();
        }
        let sma20 = sma(&closes, 20);
        let sma50 = sma(&closes, 50);
        let score = match sma20.last().unwrap().cmp(sma50.last().unwrap()) {
            std::cmp::Ordering::Greater => dec!(75),
            std::cmp::Ordering::Less => dec!(25),
            std::cmp::Ordering::Equal => dec!(50),
        };
        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Trend, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `TrendAnalysis.ema_trend`: stacked EMA(12)/EMA(26)/EMA(200) ordering.
pub struct EmaStackTrend;

impl Analyzer for EmaStackTrend {
    fn name(&self) -> &'static str {
        "ema_trend"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 200 {
            return AnalysisOutput::default();
        }
        let current = *closes.last().unwrap();
        let ema12 = *ema(&closes, 12).last().unwrap();
        let ema26 = *ema(&closes, 26).last().unwrap();
        let ema200 = *ema(&closes, 200).last().unwrap();

        let score = if current > ema12 && ema12 > ema26 && ema26 > ema200 {
            dec!(90)
        } else if current < ema12 && ema12 < ema26 && ema26 < ema200 {
            dec!(10)
        } else if ema12 > ema26 {
            dec!(70)
        } else if ema12 < ema26 {
            dec!(30)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Trend, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `TrendAnalysis.adx_trend_strength`: ADX(14), capped at 100, as a raw
/// strength score (not itself directional, so this analyzer only reports
/// confidence-carrying neutral-biased strength via the Trend category).
pub struct AdxTrendStrength;

impl Analyzer for AdxTrendStrength {
    fn name(&self) -> &'static str {
        "adx_strength"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 30 {
            return AnalysisOutput::default();
        }
        let h = highs(ctx);
        let l = lows(ctx);
        let adx_vals = adx(&h, &l, &closes, 14);
        let score = (*adx_vals.last().unwrap()).min(dec!(100));

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Trend, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `TrendAnalysis.macd_trend`: histogram momentum and sign.
pub struct MacdTrend;

impl Analyzer for MacdTrend {
    fn name(&self) -> &'static str {
        "macd_trend"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 30 {
            return AnalysisOutput::default();
        }
        let result = macd(&closes, 12, 26, 9);
        let n = result.histogram.len();
        let last = result.histogram[n - 1];
        let prev = result.histogram[n - 2];

        let score = if last > prev && prev > Decimal::ZERO {
            dec!(75)
        } else if last < prev && prev < Decimal::ZERO {
            dec!(25)
        } else if last > Decimal::ZERO {
            dec!(65)
        } else if last < Decimal::ZERO {
            dec!(35)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Trend, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `MomentumAnalysis.rsi_momentum`: RSI(14), clamped toward the extremes.
pub struct RsiMomentum;

impl Analyzer for RsiMomentum {
    fn name(&self) -> &'static str {
        "rsi_momentum"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 20 {
            return AnalysisOutput::default();
        }
        let rsi_vals = crate::domain::market::indicators::rsi(&closes, 14);
        let current = *rsi_vals.last().unwrap();

        let score = if current > dec!(70) {
            dec!(85)
        } else if current < dec!(30) {
            dec!(15)
        } else {
            current
        };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Momentum, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `VolatilityAnalysis.atr_volatility`: current ATR vs its trailing average.
pub struct AtrVolatility;

impl Analyzer for AtrVolatility {
    fn name(&self) -> &'static str {
        "atr_volatility"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 20 {
            return AnalysisOutput::default();
        }
        let h = highs(ctx);
        let l = lows(ctx);
        let atr_vals = atr(&h, &l, &closes, 14);
        let tail = &atr_vals[atr_vals.len().saturating_sub(20)..];
        let avg_atr = mean(tail);
        if avg_atr == Decimal::ZERO {
            return AnalysisOutput::default();
        }
        let ratio = *atr_vals.last().unwrap() / avg_atr;
        let score = (dec!(50) + (ratio - Decimal::ONE) * dec!(50)).clamp(Decimal::ZERO, dec!(100));

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Volatility, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `VolatilityAnalysis.bollinger_band_squeeze`: current band width vs its
/// trailing average, 0 = tight squeeze, 100 = unusually wide.
pub struct BollingerSqueeze;

impl Analyzer for BollingerSqueeze {
    fn name(&self) -> &'static str {
        "bb_squeeze"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 25 {
            return AnalysisOutput::default();
        }
        let bands = bollinger_bands(&closes, 20, dec!(2));
        let widths: Vec<Decimal> = bands.upper.iter().zip(bands.lower.iter()).map(|(u, l)| u - l).collect();
        let tail = &widths[widths.len().saturating_sub(20)..];
        let avg_width = mean(tail);
        if avg_width == Decimal::ZERO {
            return AnalysisOutput::default();
        }
        let ratio = *widths.last().unwrap() / avg_width;
        let score = (ratio * dec!(50)).clamp(Decimal::ZERO, dec!(100));

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Volatility, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

/// `VolumeAnalysis.volume_trend`: recent 10-bar average volume vs the prior
/// 10-bar average.
pub struct VolumeTrend;

impl Analyzer for VolumeTrend {
    fn name(&self) -> &'static str {
        "volume_trend"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        if ctx.candles.len() < 20 {
            return AnalysisOutput::default();
        }
        let vols = volumes(ctx);
        let n = vols.len();
        let recent_avg = mean(&vols[n - 10..]);
        let prior_avg = mean(&vols[n - 20..n - 10]);
        if prior_avg == Decimal::ZERO {
            return AnalysisOutput::default();
        }
        let ratio = recent_avg / prior_avg;
        let score = if ratio > dec!(1.2) {
            dec!(75)
        } else if ratio < dec!(0.8) {
            dec!(25)
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

/// `SessionAnalysis.london_session_analysis`: last-5-bar range vs the
/// trailing 5-bar-block average range; London typically runs hotter.
pub struct LondonSessionBehavior;

impl Analyzer for LondonSessionBehavior {
    fn name(&self) -> &'static str {
        "london_session"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 10 {
            return AnalysisOutput::default();
        }
        let tail = &closes[closes.len() - 5..];
        let london_range = tail.iter().copied().fold(Decimal::MIN, Decimal::max)
            - tail.iter().copied().fold(Decimal::MAX, Decimal::min);

        let mut block_ranges = Vec::new();
        let mut i = 5;
        while i < closes.len() {
            let start = i.saturating_sub(5);
            let block = &closes[start..=i.min(closes.len() - 1)];
            let hi = block.iter().copied().fold(Decimal::MIN, Decimal::max);
            let lo = block.iter().copied().fold(Decimal::MAX, Decimal::min);
            block_ranges.push(hi - lo);
            i += 5;
        }
        let avg_range = mean(&block_ranges);
        if avg_range == Decimal::ZERO {
            return AnalysisOutput::default();
        }

        let score = if london_range > avg_range * dec!(1.3) {
            dec!(75)
        } else if london_range < avg_range * dec!(0.7) {
            dec!(25)
        } else {
            dec!(50)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(
                SignalCategory::SessionBehavior,
                score,
                Decimal::ONE,
                self.name(),
            )],
            explanation: None,
            metadata: None,
        }
    }
}

/// `MomentumAnalysis.stochastic_momentum`: %K/%D crossover plus
/// overbought/oversold extremes, the same shape as `RsiMomentum` but on the
/// stochastic oscillator.
pub struct StochasticOscillator;

impl Analyzer for StochasticOscillator {
    fn name(&self) -> &'static str {
        "stochastic_momentum"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let closes = ctx.closes();
        if closes.len() < 20 {
            return AnalysisOutput::default();
        }
        let result = stochastic(&highs(ctx), &lows(ctx), &closes, 14, 3, 3);
        let k = *result.k.last().unwrap();
        let d = *result.d.last().unwrap();

        let score = if k > dec!(80) && d > dec!(80) {
            dec!(15)
        } else if k < dec!(20) && d < dec!(20) {
            dec!(85)
        } else if k > d {
            dec!(65)
        } else if k < d {
            dec!(35)
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

/// `SessionAnalysis.new_york_session_analysis`, generalized to use the
/// shared [`TradingSession`] GMT-hour classifier rather than re-deriving its
/// own band check: only scores bars whose timestamp actually falls in the
/// New York window, the last-5-bar range against the trailing-block average
/// (same shape as [`LondonSessionBehavior`]).
pub struct NewYorkSessionBehavior;

impl Analyzer for NewYorkSessionBehavior {
    fn name(&self) -> &'static str {
        "new_york_session"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 10 {
            return AnalysisOutput::default();
        }
        let last = &ctx.candles[n - 1];
        if TradingSession::from_timestamp_millis(last.timestamp) != TradingSession::NewYork {
            return AnalysisOutput::default();
        }

        let closes = ctx.closes();
        let tail = &closes[n - 5..];
        let ny_range = tail.iter().copied().fold(Decimal::MIN, Decimal::max)
            - tail.iter().copied().fold(Decimal::MAX, Decimal::min);

        let mut block_ranges = Vec::new();
        let mut i = 5;
        while i < closes.len() {
            let start = i.saturating_sub(5);
            let block = &closes[start..=i.min(closes.len() - 1)];
            let hi = block.iter().copied().fold(Decimal::MIN, Decimal::max);
            let lo = block.iter().copied().fold(Decimal::MAX, Decimal::min);
            block_ranges.push(hi - lo);
            i += 5;
        }
        let avg_range = mean(&block_ranges);
        if avg_range == Decimal::ZERO {
            return AnalysisOutput::default();
        }

        let score = if ny_range > avg_range * dec!(1.3) {
            dec!(80)
        } else {
            dec!(40)
        };

        AnalysisOutput {
            signals: vec![score_to_signal(
                SignalCategory::SessionBehavior,
                score,
                Decimal::ONE,
                self.name(),
            )],
            explanation: None,
            metadata: None,
        }
    }
}

/// `OrderBlockAnalysis.bullish_order_block` / `bearish_order_block`: an
/// impulsive candle at roughly 2x the local average body, on above-average
/// volume, followed by a pullback into it.
pub struct OrderBlockIdentification;

impl Analyzer for OrderBlockIdentification {
    fn name(&self) -> &'static str {
        "order_block"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 10 {
            return AnalysisOutput::default();
        }
        let closes = ctx.closes();
        let opens: Vec<Decimal> = ctx.candles.iter().map(|c| c.open).collect();
        let vols = volumes(ctx);

        let window_start = n.saturating_sub(5);
        for i in window_start..n - 1 {
            if i < 5 {
                continue;
            }
            let candle_size = (closes[i] - opens[i]).abs();
            let avg_candle = mean(
                &(i - 5..i)
                    .map(|j| (closes[j] - opens[j]).abs())
                    .collect::<Vec<_>>(),
            );
            let avg_volume = mean(&vols[i - 5..i]);

            let bullish_impulse =
                opens[i] < closes[i] && candle_size > avg_candle * dec!(2) && vols[i] > avg_volume * dec!(1.3);
            if bullish_impulse {
                let low_after = closes[i + 1..].iter().copied().fold(Decimal::MAX, Decimal::min);
                if low_after < closes[i] {
                    return AnalysisOutput {
                        signals: vec![score_to_signal(
                            SignalCategory::OrderBlocks,
                            dec!(80),
                            Decimal::ONE,
                            self.name(),
                        )],
                        explanation: None,
                        metadata: None,
                    };
                }
            }

            let bearish_impulse =
                opens[i] > closes[i] && candle_size > avg_candle * dec!(2) && vols[i] > avg_volume * dec!(1.3);
            if bearish_impulse {
                let high_after = closes[i + 1..].iter().copied().fold(Decimal::MIN, Decimal::max);
                if high_after > closes[i] {
                    return AnalysisOutput {
                        signals: vec![score_to_signal(
                            SignalCategory::OrderBlocks,
                            dec!(20),
                            Decimal::ONE,
                            self.name(),
                        )],
                        explanation: None,
                        metadata: None,
                    };
                }
            }
        }

        AnalysisOutput::default()
    }
}

/// `FairValueGapAnalysis.bullish_fvg_detection` / `bearish_fvg_detection`:
/// a 3-bar imbalance where the current low clears the bar-minus-2 high (or
/// vice versa for bearish).
pub struct FairValueGapDetection;

impl Analyzer for FairValueGapDetection {
    fn name(&self) -> &'static str {
        "fair_value_gap"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 3 {
            return AnalysisOutput::default();
        }
        let h = highs(ctx);
        let l = lows(ctx);

        for i in 2..n {
            if l[i] > h[i - 2] {
                return AnalysisOutput {
                    signals: vec![score_to_signal(
                        SignalCategory::FairValueGaps,
                        dec!(80),
                        Decimal::ONE,
                        self.name(),
                    )],
                    explanation: None,
                    metadata: None,
                };
            }
            if h[i] < l[i - 2] {
                return AnalysisOutput {
                    signals: vec![score_to_signal(
                        SignalCategory::FairValueGaps,
                        dec!(20),
                        Decimal::ONE,
                        self.name(),
                    )],
                    explanation: None,
                    metadata: None,
                };
            }
        }

        AnalysisOutput::default()
    }
}

/// `LiquidityAnalysis.liquidity_level_detection`: clusters of above-average
/// volume bars, read as resting liquidity rather than a directional lean.
pub struct LiquidityLevelDetection;

impl Analyzer for LiquidityLevelDetection {
    fn name(&self) -> &'static str {
        "liquidity_level"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        if ctx.candles.len() < 20 {
            return AnalysisOutput::default();
        }
        let vols = volumes(ctx);
        let tail = &vols[vols.len() - 20..];
        let avg_volume = mean(tail);
        let high_volume_bars = tail.iter().filter(|v| **v > avg_volume * dec!(1.5)).count();

        let score = if high_volume_bars > 3 { dec!(75) } else { dec!(50) };

        AnalysisOutput {
            signals: vec![score_to_signal(SignalCategory::Liquidity, score, Decimal::ONE, self.name())],
            explanation: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::Candle;

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
    fn test_ma_crossover_insufficient_history_is_empty() {
        let candles = rising_candles(10, 1.0, 0.001);
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = MovingAverageCrossover.analyze(&ctx);
        assert!(out.signals.is_empty());
    }

    #[test]
    fn test_ma_crossover_uptrend_is_bullish() {
        let candles = rising_candles(60, 1.0, 0.001);
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = MovingAverageCrossover.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].direction, Direction::Bullish);
    }

    #[test]
    fn test_rsi_momentum_strong_uptrend_yields_overbought_clamp() {
        let candles = rising_candles(30, 1.0, 0.01);
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = RsiMomentum.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].category, SignalCategory::Momentum);
    }

    #[test]
    fn test_fair_value_gap_detects_bullish_imbalance() {
        let mut candles = rising_candles(5, 1.0, 0.0);
        candles[3].low = candles[1].high + dec!(0.05);
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = FairValueGapDetection.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].direction, Direction::Bullish);
    }

    #[test]
    fn test_liquidity_level_insufficient_history_is_empty() {
        let candles = rising_candles(5, 1.0, 0.0);
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = LiquidityLevelDetection.analyze(&ctx);
        assert!(out.signals.is_empty());
    }

    #[test]
    fn test_stochastic_oversold_uptrend_yields_bullish() {
        let candles = rising_candles(30, 1.0, 0.01);
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = StochasticOscillator.analyze(&ctx);
        assert_eq!(out.signals.len(), 1);
        assert_eq!(out.signals[0].category, SignalCategory::Momentum);
    }

    #[test]
    fn test_new_york_session_skips_bars_outside_window() {
        // rising_candles timestamps start at epoch 0 (Tokyo session), so the
        // New York analyzer should decline to score them.
        let candles = rising_candles(20, 1.0, 0.001);
        let ctx = AnalysisContext::new("EURUSD", &candles);
        let out = NewYorkSessionBehavior.analyze(&ctx);
        assert!(out.signals.is_empty());
    }

    #[test]
    fn test_score_to_signal_midpoint_is_neutral() {
        let s = score_to_signal(SignalCategory::Trend, dec!(50), Decimal::ONE, "test");
        assert_eq!(s.direction, Direction::Neutral);
        assert_eq!(s.confidence, Decimal::ZERO);
    }
}
