//! Chart formation detectors: technical shapes formed over tens of bars
//! (double/triple tops and bottoms, head & shoulders, triangles, flags,
//! cup & handle, and more).
//!
//! A representative sample (double top/bottom, triple top/bottom, head &
//! shoulders) built on a shared local-maxima/minima primitive.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::signal::{AnalysisOutput, Direction, Signal, SignalCategory};

use super::{AnalysisContext, Analyzer};

/// `_find_local_maxima`: indices where a value is the max of its
/// `+/- window` neighborhood.
fn local_maxima(values: &[Decimal], window: usize) -> Vec<usize> {
    let mut out = Vec::new();
    if values.len() <= 2 * window {
        return out;
    }
    for i in window..values.len() - window {
        let neighborhood = &values[i - window..=i + window];
        let max = neighborhood.iter().copied().fold(Decimal::MIN, Decimal::max);
        if values[i] == max {
            out.push(i);
        }
    }
    out
}

fn local_minima(values: &[Decimal], window: usize) -> Vec<usize> {
    let mut out = Vec::new();
    if values.len() <= 2 * window {
        return out;
    }
    for i in window..values.len() - window {
        let neighborhood = &values[i - window..=i + window];
        let min = neighborhood.iter().copied().fold(Decimal::MAX, Decimal::min);
        if values[i] == min {
            out.push(i);
        }
    }
    out
}

/// `_detect_double_top_bottom`: two similar-height peaks (or troughs) in
/// the first and second half of a 20-bar window.
pub struct DoubleTopBottom;

impl Analyzer for DoubleTopBottom {
    fn name(&self) -> &'static str {
        "double_top_bottom"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 20 {
            return AnalysisOutput::default();
        }
        let tail = &ctx.candles[n - 20..];
        let highs: Vec<Decimal> = tail.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = tail.iter().map(|c| c.low).collect();

        let mut signals = Vec::new();

        let max_idx1 = argmax(&highs[..10]);
        let max_idx2 = argmax(&highs[10..]) + 10;
        if (highs[max_idx1] - highs[max_idx2]).abs() < highs[max_idx1] * dec!(0.02) {
            signals.push(
                Signal::new(SignalCategory::Structure, Direction::Bearish, dec!(80), Decimal::ONE, self.name())
                    .with_description("Double Top: twin peaks of similar height"),
            );
        }

        let min_idx1 = argmin(&lows[..10]);
        let min_idx2 = argmin(&lows[10..]) + 10;
        if (lows[min_idx1] - lows[min_idx2]).abs() < lows[min_idx1].abs() * dec!(0.02) {
            signals.push(
                Signal::new(SignalCategory::Structure, Direction::Bullish, dec!(80), Decimal::ONE, self.name())
                    .with_description("Double Bottom: twin troughs of similar depth"),
            );
        }

        AnalysisOutput { signals, explanation: None, metadata: None }
    }
}

fn argmax(data: &[Decimal]) -> usize {
    data.iter()
        .enumerate()
        .max_by_key(|(_, v)| **v)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn argmin(data: &[Decimal]) -> usize {
    data.iter()
        .enumerate()
        .min_by_key(|(_, v)| **v)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// `_detect_triple_top_bottom`: three or more local maxima (or minima) over
/// a 30-bar window.
pub struct TripleTopBottom;

impl Analyzer for TripleTopBottom {
    fn name(&self) -> &'static str {
        "triple_top_bottom"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 30 {
            return AnalysisOutput::default();
        }
        let tail = &ctx.candles[n - 30..];
        let highs: Vec<Decimal> = tail.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = tail.iter().map(|c| c.low).collect();

        let mut signals = Vec::new();
        if local_maxima(&highs, 5).len() >= 3 {
            signals.push(
                Signal::new(SignalCategory::Structure, Direction::Bearish, dec!(85), Decimal::ONE, self.name())
                    .with_description("Triple Top: three comparable peaks"),
            );
        }
        if local_minima(&lows, 5).len() >= 3 {
            signals.push(
                Signal::new(SignalCategory::Structure, Direction::Bullish, dec!(85), Decimal::ONE, self.name())
                    .with_description("Triple Bottom: three comparable troughs"),
            );
        }

        AnalysisOutput { signals, explanation: None, metadata: None }
    }
}

/// `_detect_head_and_shoulders`: a middle local-maximum higher than its two
/// flanking maxima (or, inverted, a middle minimum lower than its flanks).
pub struct HeadAndShoulders;

impl Analyzer for HeadAndShoulders {
    fn name(&self) -> &'static str {
        "head_and_shoulders"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput {
        let n = ctx.candles.len();
        if n < 30 {
            return AnalysisOutput::default();
        }
        let tail = &ctx.candles[n - 30..];
        let highs: Vec<Decimal> = tail.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = tail.iter().map(|c| c.low).collect();

        let mut signals = Vec::new();

        let peaks = local_maxima(&highs, 5);
        if peaks.len() >= 3 && peaks[1] < highs.len() - 1 && highs[peaks[1]] > highs[peaks[0]] && highs[peaks[1]] > highs[peaks[2]] {
            signals.push(
                Signal::new(SignalCategory::Structure, Direction::Bearish, dec!(85), Decimal::ONE, self.name())
                    .with_description("Head & Shoulders: middle peak dominant over both shoulders"),
            );
        }

        let troughs = local_minima(&lows, 5);
        if troughs.len() >= 3 && troughs[1] < lows.len() - 1 && lows[troughs[1]] < lows[troughs[0]] && lows[troughs[1]] < lows[troughs[2]] {
            signals.push(
                Signal::new(SignalCategory::Structure, Direction::Bullish, dec!(85), Decimal::ONE, self.name())
                    .with_description("Inverse Head & Shoulders: middle trough dominant over both shoulders"),
            );
        }

        AnalysisOutput { signals, explanation: None, metadata: None }
    }
}
