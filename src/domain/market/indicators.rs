//! Whole-vector technical indicators over `Decimal` price series.
//!
//! Each function returns a vector the same length as its input, with a
//! warm-up prefix (the initial bars that lack enough history to compute a
//! real value) filled with `Decimal::ZERO`. Callers that need to
//! distinguish "zero value" from "warm-up" should slice off the first
//! `period` (or `period - 1`) entries, as documented per function.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Simple moving average over a trailing window of `period` bars.
///
/// Warm-up: the first `period - 1` entries are `Decimal::ZERO`.
pub fn sma(data: &[Decimal], period: usize) -> Vec<Decimal> {
    let mut out = vec![Decimal::ZERO; data.len()];
    if period == 0 || data.len() < period {
        return out;
    }
    let mut window_sum: Decimal = data[..period].iter().sum();
    out[period - 1] = window_sum / Decimal::from(period);
    for i in period..data.len() {
        window_sum += data[i] - data[i - period];
        out[i] = window_sum / Decimal::from(period);
    }
    out
}

/// Exponential moving average, seeded from the first data point (matching
/// pandas' `ewm(adjust=False)` with `span=period`), so there is no warm-up
/// prefix: every entry is populated.
pub fn ema(data: &[Decimal], period: usize) -> Vec<Decimal> {
    let mut out = vec![Decimal::ZERO; data.len()];
    if data.is_empty() || period == 0 {
        return out;
    }
    let alpha = dec!(2) / Decimal::from(period + 1);
    out[0] = data[0];
    for i in 1..data.len() {
        out[i] = alpha * data[i] + (Decimal::ONE - alpha) * out[i - 1];
    }
    out
}

/// Wilder-smoothed relative strength index.
///
/// Warm-up: the first `period` entries share the seed RSI computed from the
/// first `period` deltas (matching the source's `rsi_values[:period]` fill).
pub fn rsi(data: &[Decimal], period: usize) -> Vec<Decimal> {
    let mut out = vec![Decimal::ZERO; data.len()];
    if data.len() <= period || period == 0 {
        return out;
    }

    let deltas: Vec<Decimal> = data.windows(2).map(|w| w[1] - w[0]).collect();

    let seed = &deltas[..period];
    let up_sum: Decimal = seed.iter().filter(|d| **d >= Decimal::ZERO).sum();
    let down_sum: Decimal = seed.iter().filter(|d| **d < Decimal::ZERO).map(|d| -*d).sum();
    let mut up = up_sum / Decimal::from(period);
    let mut down = down_sum / Decimal::from(period);

    let seed_rsi = rsi_from_up_down(up, down);
    for slot in out.iter_mut().take(period) {
        *slot = seed_rsi;
    }

    for i in period..data.len() {
        let delta = deltas[i - 1];
        let (upval, downval) = if delta > Decimal::ZERO {
            (delta, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -delta)
        };
        up = (up * Decimal::from(period - 1) + upval) / Decimal::from(period);
        down = (down * Decimal::from(period - 1) + downval) / Decimal::from(period);
        out[i] = rsi_from_up_down(up, down);
    }

    out
}

fn rsi_from_up_down(up: Decimal, down: Decimal) -> Decimal {
    if down == Decimal::ZERO {
        if up == Decimal::ZERO {
            return dec!(50);
        }
        return dec!(100);
    }
    let rs = up / down;
    dec!(100) - dec!(100) / (Decimal::ONE + rs)
}

/// MACD line, signal line, and histogram.
pub struct Macd {
    pub macd_line: Vec<Decimal>,
    pub signal_line: Vec<Decimal>,
    pub histogram: Vec<Decimal>,
}

pub fn macd(data: &[Decimal], fast: usize, slow: usize, signal: usize) -> Macd {
    let ema_fast = ema(data, fast);
    let ema_slow = ema(data, slow);
    let macd_line: Vec<Decimal> = ema_fast.iter().zip(ema_slow.iter()).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, signal);
    let histogram: Vec<Decimal> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    Macd {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Upper, middle (SMA), and lower Bollinger bands.
pub struct BollingerBands {
    pub upper: Vec<Decimal>,
    pub middle: Vec<Decimal>,
    pub lower: Vec<Decimal>,
}

pub fn bollinger_bands(data: &[Decimal], period: usize, std_dev: Decimal) -> BollingerBands {
    let middle = sma(data, period);
    let mut upper = vec![Decimal::ZERO; data.len()];
    let mut lower = vec![Decimal::ZERO; data.len()];

    if period == 0 || data.len() < period {
        return BollingerBands { upper, middle, lower };
    }

    for i in (period - 1)..data.len() {
        let window = &data[i + 1 - period..=i];
        let mean = middle[i];
        let variance: Decimal = window.iter().map(|v| (*v - mean) * (*v - mean)).sum::<Decimal>()
            / Decimal::from(period);
        let std = decimal_sqrt(variance);
        upper[i] = mean + std * std_dev;
        lower[i] = mean - std * std_dev;
    }

    BollingerBands { upper, middle, lower }
}

/// Newton's method square root for `Decimal`, since `rust_decimal` has no
/// built-in `sqrt`. Converges in a handful of iterations for the magnitudes
/// seen in price variance.
fn decimal_sqrt(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut guess = value;
    for _ in 0..40 {
        let next = (guess + value / guess) / dec!(2);
        if (next - guess).abs() < dec!(0.0000000001) {
            return next;
        }
        guess = next;
    }
    guess
}

/// Average True Range, Wilder-smoothed.
///
/// Warm-up: the first `period - 1` entries are the flat average of the
/// leading true-range window (matching the source's `atr_values[:period]`
/// fill), then Wilder smoothing takes over from index `period` onward.
pub fn atr(high: &[Decimal], low: &[Decimal], close: &[Decimal], period: usize) -> Vec<Decimal> {
    let n = high.len();
    let mut tr = vec![Decimal::ZERO; n];
    for i in 0..n {
        if i == 0 {
            tr[i] = high[i] - low[i];
            continue;
        }
        let tr1 = high[i] - low[i];
        let tr2 = (high[i] - close[i - 1]).abs();
        let tr3 = (low[i] - close[i - 1]).abs();
        tr[i] = tr1.max(tr2).max(tr3);
    }

    let mut out = vec![Decimal::ZERO; n];
    if n < period || period == 0 {
        return out;
    }

    let seed_mean: Decimal = tr[..period].iter().sum::<Decimal>() / Decimal::from(period);
    for slot in out.iter_mut().take(period) {
        *slot = seed_mean;
    }

    for i in period..n {
        out[i] = (out[i - 1] * Decimal::from(period - 1) + tr[i]) / Decimal::from(period);
    }

    out
}

/// Smoothed %K and %D stochastic oscillator lines.
pub struct Stochastic {
    pub k: Vec<Decimal>,
    pub d: Vec<Decimal>,
}

pub fn stochastic(
    high: &[Decimal],
    low: &[Decimal],
    close: &[Decimal],
    period: usize,
    smooth_k: usize,
    smooth_d: usize,
) -> Stochastic {
    let n = close.len();
    let mut k_raw = vec![Decimal::ZERO; n];

    if n >= period && period > 0 {
        for i in (period - 1)..n {
            let window_low = &low[i + 1 - period..=i];
            let window_high = &high[i + 1 - period..=i];
            let lowest = window_low.iter().copied().fold(Decimal::MAX, Decimal::min);
            let highest = window_high.iter().copied().fold(Decimal::MIN, Decimal::max);
            if highest != lowest {
                k_raw[i] = dec!(100) * (close[i] - lowest) / (highest - lowest);
            }
        }
    }

    let k = sma(&k_raw, smooth_k);
    let d = sma(&k, smooth_d);
    Stochastic { k, d }
}

/// On-balance volume, running cumulative sum signed by close direction.
pub fn obv(close: &[Decimal], volume: &[Decimal]) -> Vec<Decimal> {
    let n = close.len();
    let mut out = vec![Decimal::ZERO; n];
    if n == 0 {
        return out;
    }
    out[0] = volume[0];
    for i in 1..n {
        out[i] = if close[i] > close[i - 1] {
            out[i - 1] + volume[i]
        } else if close[i] < close[i - 1] {
            out[i - 1] - volume[i]
        } else {
            out[i - 1]
        };
    }
    out
}

/// Average Directional Index, derived from smoothed +DI/-DI.
pub fn adx(high: &[Decimal], low: &[Decimal], close: &[Decimal], period: usize) -> Vec<Decimal> {
    let n = high.len();
    let mut plus_dm = vec![Decimal::ZERO; n];
    let mut minus_dm = vec![Decimal::ZERO; n];

    for i in 1..n {
        let up_move = high[i] - high[i - 1];
        let down_move = low[i - 1] - low[i];
        if up_move > down_move && up_move > Decimal::ZERO {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > Decimal::ZERO {
            minus_dm[i] = down_move;
        }
    }

    let atr_vals = atr(high, low, close, period);
    let plus_dm_sma = sma(&plus_dm, period);
    let minus_dm_sma = sma(&minus_dm, period);

    let mut dx = vec![Decimal::ZERO; n];
    for i in 0..n {
        if atr_vals[i] == Decimal::ZERO {
            continue;
        }
        let plus_di = dec!(100) * plus_dm_sma[i] / atr_vals[i];
        let minus_di = dec!(100) * minus_dm_sma[i] / atr_vals[i];
        let di_sum = plus_di + minus_di;
        let di_sum = if di_sum == Decimal::ZERO { Decimal::ONE } else { di_sum };
        dx[i] = dec!(100) * (plus_di - minus_di).abs() / di_sum;
    }

    sma(&dx, period)
}

/// Rate of change over `period` bars, as a percentage.
pub fn roc(data: &[Decimal], period: usize) -> Vec<Decimal> {
    let mut out = vec![Decimal::ZERO; data.len()];
    if period == 0 {
        return out;
    }
    for i in period..data.len() {
        if data[i - period] != Decimal::ZERO {
            out[i] = (data[i] - data[i - period]) / data[i - period] * dec!(100);
        }
    }
    out
}

/// Williams %R, a `[-100, 0]`-bounded momentum oscillator.
pub fn williams_percent_r(high: &[Decimal], low: &[Decimal], close: &[Decimal], period: usize) -> Vec<Decimal> {
    let n = close.len();
    let mut out = vec![Decimal::ZERO; n];
    if n < period || period == 0 {
        return out;
    }
    for i in (period - 1)..n {
        let window_low = &low[i + 1 - period..=i];
        let window_high = &high[i + 1 - period..=i];
        let lowest = window_low.iter().copied().fold(Decimal::MAX, Decimal::min);
        let highest = window_high.iter().copied().fold(Decimal::MIN, Decimal::max);
        if highest != lowest {
            out[i] = dec!(-100) * (highest - close[i]) / (highest - lowest);
        }
    }
    out
}

/// Commodity Channel Index against the typical price `(H+L+C)/3`.
pub fn cci(high: &[Decimal], low: &[Decimal], close: &[Decimal], period: usize) -> Vec<Decimal> {
    let n = close.len();
    let typical: Vec<Decimal> = (0..n).map(|i| (high[i] + low[i] + close[i]) / dec!(3)).collect();
    let sma_tp = sma(&typical, period);

    let mut out = vec![Decimal::ZERO; n];
    if n < period || period == 0 {
        return out;
    }

    for i in (period - 1)..n {
        let window = &typical[i + 1 - period..=i];
        let mean = sma_tp[i];
        let mad: Decimal =
            window.iter().map(|v| (*v - mean).abs()).sum::<Decimal>() / Decimal::from(period);
        if mad != Decimal::ZERO {
            out[i] = (typical[i] - mean) / (dec!(0.015) * mad);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_sma_warms_up_then_averages() {
        let data = series(&[1, 2, 3, 4, 5]);
        let out = sma(&data, 3);
        assert_eq!(out[0], Decimal::ZERO);
        assert_eq!(out[1], Decimal::ZERO);
        assert_eq!(out[2], dec!(2));
        assert_eq!(out[3], dec!(3));
        assert_eq!(out[4], dec!(4));
    }

    #[test]
    fn test_ema_seeds_from_first_value() {
        let data = series(&[10, 20, 30]);
        let out = ema(&data, 2);
        assert_eq!(out[0], dec!(10));
        assert!(out[1] > dec!(10) && out[1] < dec!(20));
    }

    #[test]
    fn test_rsi_all_up_approaches_100() {
        let data = series(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
        let out = rsi(&data, 14);
        assert_eq!(out[15], dec!(100));
    }

    #[test]
    fn test_macd_histogram_is_macd_minus_signal() {
        let data = series(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
        let result = macd(&data, 3, 6, 2);
        for i in 0..data.len() {
            assert_eq!(result.histogram[i], result.macd_line[i] - result.signal_line[i]);
        }
    }

    #[test]
    fn test_bollinger_bands_straddle_middle() {
        let data = series(&[10, 11, 9, 12, 8, 13, 7, 14, 6, 15]);
        let bands = bollinger_bands(&data, 5, dec!(2));
        for i in 4..data.len() {
            assert!(bands.upper[i] >= bands.middle[i]);
            assert!(bands.lower[i] <= bands.middle[i]);
        }
    }

    #[test]
    fn test_atr_nonnegative() {
        let high = series(&[10, 11, 12, 11, 13, 14]);
        let low = series(&[8, 9, 10, 9, 11, 12]);
        let close = series(&[9, 10, 11, 10, 12, 13]);
        let out = atr(&high, &low, &close, 3);
        for v in out {
            assert!(v >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_obv_accumulates_on_up_close() {
        let close = series(&[10, 11, 10, 12]);
        let volume = series(&[100, 100, 100, 100]);
        let out = obv(&close, &volume);
        assert_eq!(out[0], dec!(100));
        assert_eq!(out[1], dec!(200));
        assert_eq!(out[2], dec!(100));
        assert_eq!(out[3], dec!(200));
    }

    #[test]
    fn test_roc_zero_on_equal_price() {
        let data = series(&[100, 100, 100, 100]);
        let out = roc(&data, 2);
        assert_eq!(out[2], Decimal::ZERO);
        assert_eq!(out[3], Decimal::ZERO);
    }

    #[test]
    fn test_williams_r_bounded() {
        let high = series(&[10, 11, 12, 13, 14]);
        let low = series(&[8, 9, 10, 11, 12]);
        let close = series(&[9, 10, 11, 12, 13]);
        let out = williams_percent_r(&high, &low, &close, 3);
        for v in out {
            assert!(v <= Decimal::ZERO && v >= dec!(-100));
        }
    }

    #[test]
    fn test_cci_zero_when_flat() {
        let high = series(&[10, 10, 10, 10, 10]);
        let low = series(&[10, 10, 10, 10, 10]);
        let close = series(&[10, 10, 10, 10, 10]);
        let out = cci(&high, &low, &close, 3);
        assert!(out.iter().all(|v| *v == Decimal::ZERO));
    }
}
