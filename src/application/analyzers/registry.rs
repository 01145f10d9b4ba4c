//! Assembles the analyzer set that applies to a given symbol and runs all of
//! them over a candle window, producing the flat signal list the confluence
//! engine consumes.
//!
//! The category split mirrors the source's per-asset-class analyzer
//! selection: forex-family symbols get the forex order-flow/session/
//! liquidity analyzers, synthetic-family symbols (volatility, boom/crash,
//! jump, step indices) get the synthetic-regime analyzers, and everything
//! else falls back to the general-asset group. Structure, chart-formation
//! and candlestick analyzers are asset-agnostic and run for every symbol,
//! the same way the source's shared pattern catalogs apply regardless of
//! asset class.

use rust_decimal::Decimal;

use crate::domain::signal::{Signal, SignalCategory};
use crate::domain::symbol::{SymbolCatalog, SymbolCategory};

use super::{candlestick, candlestick_context, chart_formations, forex, general, structure, synthetic};
use super::{AnalysisContext, Analyzer};

/// Caps how many candlestick-category signals survive the contextual
/// re-weighting pass, matching [`candlestick_context::filter_pattern_set`]'s
/// intended use as a noise filter rather than an exhaustive report.
const MAX_CANDLESTICK_SIGNALS: usize = 5;

/// Holds one boxed analyzer list per asset-class group plus the always-on
/// shared groups, built once at startup and reused across every analysis
/// call.
pub struct AnalyzerRegistry {
    forex: Vec<Box<dyn Analyzer>>,
    general: Vec<Box<dyn Analyzer>>,
    synthetic: Vec<Box<dyn Analyzer>>,
    structure: Vec<Box<dyn Analyzer>>,
    chart_formations: Vec<Box<dyn Analyzer>>,
    candlestick: Vec<Box<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self {
            forex: forex_analyzers(),
            general: general_analyzers(),
            synthetic: synthetic_analyzers(),
            structure: structure_analyzers(),
            chart_formations: chart_formation_analyzers(),
            candlestick: candlestick_analyzers(),
        }
    }

    /// Runs every analyzer applicable to `symbol` over `candles`, returning
    /// the combined signal list with candlestick-category signals already
    /// re-weighted by [`candlestick_context`].
    pub fn analyze(&self, symbol: &str, candles: &[crate::domain::market::candle::Candle]) -> Vec<Signal> {
        let ctx = AnalysisContext::new(symbol, candles);
        let category = SymbolCatalog::classify(symbol);

        let mut signals = Vec::new();
        signals.extend(self.run_group(&self.structure, &ctx));
        signals.extend(self.run_group(&self.chart_formations, &ctx));

        let asset_group = if category.is_forex_family() {
            &self.forex
        } else if category.is_synthetic_family() {
            &self.synthetic
        } else {
            &self.general
        };
        signals.extend(self.run_group(asset_group, &ctx));

        let raw_candlestick = self.run_group(&self.candlestick, &ctx);
        let (candlestick_signals, other): (Vec<Signal>, Vec<Signal>) =
            signals_into_candlestick_split(raw_candlestick);
        signals.extend(other);
        signals.extend(candlestick_context::filter_pattern_set(&candlestick_signals, candles, MAX_CANDLESTICK_SIGNALS));

        signals
    }

    fn run_group(&self, group: &[Box<dyn Analyzer>], ctx: &AnalysisContext<'_>) -> Vec<Signal> {
        group.iter().flat_map(|a| a.analyze(ctx).signals).collect()
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Every candlestick analyzer emits `SignalCategory::Candlestick`
/// exclusively, so this is just a type-stable partition rather than a real
/// filter; kept as a function so the split reads clearly at the call site.
fn signals_into_candlestick_split(signals: Vec<Signal>) -> (Vec<Signal>, Vec<Signal>) {
    signals.into_iter().partition(|s| s.category == SignalCategory::Candlestick)
}

fn forex_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(forex::MovingAverageCrossover),
        Box::new(forex::EmaStackTrend),
        Box::new(forex::AdxTrendStrength),
        Box::new(forex::MacdTrend),
        Box::new(forex::RsiMomentum),
        Box::new(forex::AtrVolatility),
        Box::new(forex::BollingerSqueeze),
        Box::new(forex::VolumeTrend),
        Box::new(forex::LondonSessionBehavior),
        Box::new(forex::NewYorkSessionBehavior),
        Box::new(forex::StochasticOscillator),
        Box::new(forex::OrderBlockIdentification),
        Box::new(forex::FairValueGapDetection),
        Box::new(forex::LiquidityLevelDetection),
    ]
}

fn general_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(general::BreakoutDetection),
        Box::new(general::PullbackDetection),
        Box::new(general::ConsolidationDetection),
        Box::new(general::RangeExpansion),
        Box::new(general::VolatilityMeanReversion),
        Box::new(general::VolumeProfile),
        Box::new(general::ObvTrend),
        Box::new(general::CciExtreme),
        Box::new(general::WilliamsRExtreme),
        Box::new(general::RocMomentum),
    ]
}

fn synthetic_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(synthetic::BoomCrashReversal),
        Box::new(synthetic::StepDirectionPattern),
        Box::new(synthetic::StepSizeConsistency),
        Box::new(synthetic::SyntheticVolatilityLevel),
        Box::new(synthetic::SyntheticVolatilityExpansion),
    ]
}

fn structure_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(structure::HigherHighsLowerLows),
        Box::new(structure::AcceleratingTrend),
        Box::new(structure::RectangleConsolidation),
        Box::new(structure::FlagContinuation),
    ]
}

fn chart_formation_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(chart_formations::DoubleTopBottom),
        Box::new(chart_formations::TripleTopBottom),
        Box::new(chart_formations::HeadAndShoulders),
    ]
}

fn candlestick_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(candlestick::DojiPattern),
        Box::new(candlestick::HammerPattern),
        Box::new(candlestick::ShootingStarPattern),
        Box::new(candlestick::EngulfingPattern),
        Box::new(candlestick::HaramiPattern),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::Candle;
    use rust_decimal_macros::dec;

    fn candle(i: i64, base: Decimal) -> Candle {
        Candle {
            timestamp: i,
            open: base,
            high: base + dec!(0.02),
            low: base - dec!(0.02),
            close: base + dec!(0.01),
            tick_volume: 100,
            real_volume: 0,
            spread: 1,
        }
    }

    fn uptrend(n: usize) -> Vec<Candle> {
        (0..n as i64).map(|i| candle(i, dec!(1.0) + Decimal::from(i) * dec!(0.01))).collect()
    }

    #[test]
    fn test_forex_symbol_runs_forex_and_shared_groups() {
        let registry = AnalyzerRegistry::new();
        let candles = uptrend(60);
        let signals = registry.analyze("EURUSD", &candles);
        assert!(!signals.is_empty());
    }

    #[test]
    fn test_synthetic_symbol_runs_synthetic_and_shared_groups() {
        let registry = AnalyzerRegistry::new();
        let candles = uptrend(60);
        let signals = registry.analyze("Boom 1000 Index", &candles);
        assert!(!signals.is_empty());
    }

    #[test]
    fn test_other_symbol_runs_general_and_shared_groups() {
        let registry = AnalyzerRegistry::new();
        let candles = uptrend(60);
        let signals = registry.analyze("UNKNOWNSYMBOL", &candles);
        assert!(!signals.is_empty());
    }

    #[test]
    fn test_candlestick_signals_are_context_reweighted_not_raw() {
        let registry = AnalyzerRegistry::new();
        let candles = uptrend(60);
        let signals = registry.analyze("EURUSD", &candles);
        let candlestick_count =
            signals.iter().filter(|s| s.category == SignalCategory::Candlestick).count();
        assert!(candlestick_count <= MAX_CANDLESTICK_SIGNALS);
    }

    #[test]
    fn test_empty_history_does_not_panic() {
        let registry = AnalyzerRegistry::new();
        let signals = registry.analyze("EURUSD", &[]);
        assert!(signals.is_empty());
    }
}
