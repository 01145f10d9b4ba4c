//! The analyzer library: one `impl Analyzer` per detection technique, grouped
//! by symbol family and fed into [`crate::domain::confluence`] by the
//! registry.

pub mod candlestick;
pub mod candlestick_context;
pub mod chart_formations;
pub mod forex;
pub mod general;
pub mod registry;
pub mod structure;
pub mod synthetic;

use crate::domain::market::candle::Candle;
use crate::domain::signal::AnalysisOutput;

/// The window of candles handed to every analyzer invocation. Borrowed, not
/// owned: analyzers never clone candle history, only read tails of it.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub symbol: &'a str,
    pub candles: &'a [Candle],
}

impl<'a> AnalysisContext<'a> {
    pub fn new(symbol: &'a str, candles: &'a [Candle]) -> Self {
        Self { symbol, candles }
    }

    pub fn closes(&self) -> Vec<rust_decimal::Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

/// One self-contained detector over a candle window.
///
/// Implementations never fail: short history produces a neutral/empty
/// `AnalysisOutput` rather than an `Err`, the same "return a neutral 50
/// confidence on insufficient data" convention every analyzer in this
/// registry follows.
pub trait Analyzer: Send + Sync {
    /// Stable identifier surfaced as `Signal::source` and in logs.
    fn name(&self) -> &'static str;

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalysisOutput;
}
