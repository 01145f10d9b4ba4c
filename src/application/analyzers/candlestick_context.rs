//! Context-aware candlestick pattern evaluation.
//!
//! A raw pattern match from [`super::candlestick`] only knows its own two or
//! three bars; it says nothing about whether the move agrees with the
//! prevailing trend, sits near a support/resistance level, or arrived on a
//! noise candle in a quiet market. This module folds that context into the
//! pattern's confidence before it reaches the confluence engine, and applies
//! the catalog's fixed 0.60 de-weighting so candlestick evidence never
//! outweighs structure or trend evidence on its own.
//!
//! Deviates from the source in one respect: rather than re-deriving a
//! pattern's bullish/bearish/neutral lean from its name, this evaluator
//! takes the [`Direction`] the pattern analyzer already computed, since the
//! domain model carries that as a typed field rather than a string key.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::market::candle::Candle;
use crate::domain::market::indicators::sma;
use crate::domain::signal::{Direction, Signal};

/// Prevailing trend read from the moving-average stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

/// Current range-expansion regime relative to its trailing average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

/// Market context a pattern is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct PatternContext {
    pub trend_direction: TrendDirection,
    pub volatility_regime: VolatilityRegime,
    pub near_support: bool,
    pub near_resistance: bool,
    pub in_liquidity_zone: bool,
    /// Body size as a percentage of the candle's range, in `[0, 100]`.
    pub candle_strength: Decimal,
}

impl PatternContext {
    fn flat() -> Self {
        Self {
            trend_direction: TrendDirection::Sideways,
            volatility_regime: VolatilityRegime::Normal,
            near_support: false,
            near_resistance: false,
            in_liquidity_zone: false,
            candle_strength: dec!(50),
        }
    }
}

/// Derives a [`PatternContext`] from the trailing candle history. Needs at
/// least 20 bars; shorter history falls back to a neutral context.
pub fn analyze_context(candles: &[Candle]) -> PatternContext {
    if candles.len() < 20 {
        return PatternContext::flat();
    }

    let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
    let sma20 = *sma(&closes, 20).last().unwrap();
    let sma50 = if closes.len() >= 50 { *sma(&closes, 50).last().unwrap() } else { sma20 };
    let current_price = *closes.last().unwrap();

    let trend_direction = if current_price > sma20 && sma20 > sma50 {
        TrendDirection::Up
    } else if current_price < sma20 && sma20 < sma50 {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    };

    let n = candles.len();
    let last10 = &candles[n - 10..];
    let recent_volatility =
        last10.iter().map(|c| c.high).fold(Decimal::MIN, Decimal::max) - last10.iter().map(|c| c.low).fold(Decimal::MAX, Decimal::min);
    let last20 = &candles[n - 20..];
    let avg_volatility: Decimal =
        last20.iter().map(|c| c.high - c.low).sum::<Decimal>() / Decimal::from(last20.len());

    let volatility_regime = if avg_volatility > Decimal::ZERO && recent_volatility > avg_volatility * dec!(1.5) {
        VolatilityRegime::High
    } else if avg_volatility > Decimal::ZERO && recent_volatility < avg_volatility * dec!(0.7) {
        VolatilityRegime::Low
    } else {
        VolatilityRegime::Normal
    };

    // Nearest local min/max over the trailing 20-bar window, standing in
    // for the source's support/resistance level list.
    let window = &closes[n - 20..];
    let support = window.iter().copied().fold(Decimal::MAX, Decimal::min);
    let resistance = window.iter().copied().fold(Decimal::MIN, Decimal::max);

    let near_support = current_price > Decimal::ZERO && (current_price - support).abs() < current_price * dec!(0.01);
    let near_resistance =
        current_price > Decimal::ZERO && (current_price - resistance).abs() < current_price * dec!(0.01);

    let recent_high = last10.iter().map(|c| c.high).fold(Decimal::MIN, Decimal::max);
    let recent_low = last10.iter().map(|c| c.low).fold(Decimal::MAX, Decimal::min);
    let in_liquidity_zone = current_price > Decimal::ZERO
        && ((current_price - recent_high).abs() < current_price * dec!(0.005)
            || (current_price - recent_low).abs() < current_price * dec!(0.005));

    let last = candles.last().unwrap();
    let candle_range = last.high - last.low;
    let candle_body = (last.close - last.open).abs();
    let candle_strength = if candle_range > Decimal::ZERO {
        (candle_body / candle_range * dec!(100)).min(dec!(100))
    } else {
        dec!(50)
    };

    PatternContext {
        trend_direction,
        volatility_regime,
        near_support,
        near_resistance,
        in_liquidity_zone,
        candle_strength,
    }
}

fn apply_context_adjustments(confidence: Decimal, direction: Direction, context: &PatternContext) -> Decimal {
    let mut adjusted = confidence;

    adjusted *= match (direction, context.trend_direction) {
        (Direction::Bullish, TrendDirection::Up) => dec!(1.15),
        (Direction::Bearish, TrendDirection::Down) => dec!(1.15),
        (_, TrendDirection::Sideways) => dec!(0.9),
        _ => dec!(0.7),
    };

    if direction == Direction::Bullish && context.near_support {
        adjusted *= dec!(1.20);
    } else if direction == Direction::Bearish && context.near_resistance {
        adjusted *= dec!(1.20);
    }

    adjusted *= match context.volatility_regime {
        VolatilityRegime::High => dec!(0.8),
        VolatilityRegime::Low => dec!(0.9),
        VolatilityRegime::Normal => Decimal::ONE,
    };

    if context.candle_strength > dec!(70) {
        adjusted *= dec!(1.10);
    } else if context.candle_strength < dec!(30) {
        adjusted *= dec!(0.7);
    }

    adjusted.clamp(Decimal::ZERO, dec!(100))
}

fn apply_false_positive_filter(confidence: Decimal, candles: &[Candle]) -> Decimal {
    if candles.len() < 5 {
        return Decimal::ZERO;
    }
    let mut adjusted = confidence;
    let last = candles.last().unwrap();

    if last.spread > 0 && last.close > Decimal::ZERO {
        let spread_pct = Decimal::from(last.spread) / last.close * dec!(100);
        if spread_pct > dec!(0.5) {
            adjusted *= dec!(0.6);
        }
    }

    let n = candles.len();
    let last10 = &candles[n.saturating_sub(10)..];
    let avg_candle_size: Decimal = last10.iter().map(|c| c.high - c.low).sum::<Decimal>() / Decimal::from(last10.len());
    let candle_size = (last.close - last.open).abs();
    if avg_candle_size > Decimal::ZERO && candle_size < avg_candle_size * dec!(0.3) {
        adjusted *= dec!(0.5);
    }

    let avg_volume: Decimal =
        last10.iter().map(|c| Decimal::from(c.tick_volume)).sum::<Decimal>() / Decimal::from(last10.len());
    if avg_volume > Decimal::ZERO && Decimal::from(last.tick_volume) < avg_volume * dec!(0.3) {
        adjusted *= dec!(0.7);
    }

    adjusted.clamp(Decimal::ZERO, dec!(100))
}

/// Evaluates one pattern match in context, returning the adjusted
/// confidence (already scaled to the catalog's fixed 0.60 pattern weight)
/// and the pattern's unchanged direction.
pub fn evaluate_pattern(
    candles: &[Candle],
    direction: Direction,
    confidence: Decimal,
    context: Option<&PatternContext>,
) -> (Decimal, Direction) {
    let owned_context;
    let context = match context {
        Some(c) => c,
        None => {
            owned_context = analyze_context(candles);
            &owned_context
        }
    };

    let adjusted = apply_context_adjustments(confidence, direction, context);
    let adjusted = apply_false_positive_filter(adjusted, candles);
    (adjusted * dec!(0.60), direction)
}

/// Re-evaluates a batch of candlestick signals in context, drops any whose
/// adjusted confidence falls at or below 20, and keeps only the strongest
/// `max_patterns`.
pub fn filter_pattern_set(signals: &[Signal], candles: &[Candle], max_patterns: usize) -> Vec<Signal> {
    let context = analyze_context(candles);

    let mut evaluated: Vec<Signal> = signals
        .iter()
        .filter_map(|s| {
            let (adjusted, direction) = evaluate_pattern(candles, s.direction, s.confidence, Some(&context));
            if adjusted > dec!(20) {
                let mut out = s.clone();
                out.direction = direction;
                out.confidence = adjusted;
                Some(out)
            } else {
                None
            }
        })
        .collect();

    evaluated.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    evaluated.truncate(max_patterns);
    evaluated
}

/// Quick reliability check: adjusted confidence strictly above 50.
pub fn is_pattern_reliable(candles: &[Candle], direction: Direction, confidence: Decimal) -> bool {
    let (adjusted, _) = evaluate_pattern(candles, direction, confidence, None);
    adjusted > dec!(50)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: Decimal, range: Decimal, volume: u64, spread: u32) -> Candle {
        Candle {
            timestamp: 0,
            open: close,
            high: close + range / dec!(2),
            low: close - range / dec!(2),
            close,
            tick_volume: volume,
            real_volume: 0,
            spread,
        }
    }

    fn uptrend(n: usize) -> Vec<Candle> {
        (0..n).map(|i| candle(dec!(1.0) + Decimal::from(i) * dec!(0.01), dec!(0.02), 100, 1)).collect()
    }

    #[test]
    fn test_short_history_falls_back_to_flat_context() {
        let candles = uptrend(5);
        let ctx = analyze_context(&candles);
        assert_eq!(ctx.trend_direction, TrendDirection::Sideways);
    }

    #[test]
    fn test_bullish_pattern_boosted_in_uptrend() {
        let candles = uptrend(60);
        let ctx = analyze_context(&candles);
        assert_eq!(ctx.trend_direction, TrendDirection::Up);

        let (adjusted, direction) = evaluate_pattern(&candles, Direction::Bullish, dec!(80), Some(&ctx));
        assert_eq!(direction, Direction::Bullish);
        // 80 * 1.15 (trend) * 1.10 (strong candle, body==range) clamped, then * 0.6
        assert!(adjusted > dec!(40));
    }

    #[test]
    fn test_confidence_always_scaled_by_global_pattern_weight() {
        let candles = uptrend(60);
        let (adjusted, _) = evaluate_pattern(&candles, Direction::Bullish, dec!(100), None);
        assert!(adjusted <= dec!(100) * dec!(0.60) * dec!(1.15) * dec!(1.20) * dec!(1.10));
    }

    #[test]
    fn test_too_little_history_yields_zero_confidence() {
        let candles = uptrend(3);
        let (adjusted, _) = evaluate_pattern(&candles, Direction::Bullish, dec!(80), None);
        assert_eq!(adjusted, Decimal::ZERO);
    }

    #[test]
    fn test_filter_pattern_set_caps_at_max_and_sorts_descending() {
        let candles = uptrend(60);
        let signals = vec![
            Signal::new(crate::domain::signal::SignalCategory::Candlestick, Direction::Bullish, dec!(90), dec!(1), "a"),
            Signal::new(crate::domain::signal::SignalCategory::Candlestick, Direction::Bullish, dec!(60), dec!(1), "b"),
            Signal::new(crate::domain::signal::SignalCategory::Candlestick, Direction::Bullish, dec!(95), dec!(1), "c"),
        ];
        let filtered = filter_pattern_set(&signals, &candles, 2);
        assert_eq!(filtered.len(), 2);
        assert!(filtered[0].confidence >= filtered[1].confidence);
    }
}
