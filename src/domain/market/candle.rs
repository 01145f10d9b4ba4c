use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::timeframe::Timeframe;

/// A single OHLCV bar as returned by the bridge's `copy_rates_from*` calls.
///
/// Immutable once committed to a [`CandleWindow`]. Invariant:
/// `low <= open, close <= high`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub tick_volume: u64,
    pub real_volume: u64,
    pub spread: u32,
}

impl Candle {
    pub fn is_valid(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }

    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Fraction of the candle's range occupied by its body, in [0, 100].
    pub fn body_strength_pct(&self) -> Decimal {
        let range = self.range();
        if range <= Decimal::ZERO {
            return Decimal::from(50);
        }
        (self.body() / range) * Decimal::from(100)
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// An ordered, read-only sequence of [`Candle`]s for one `(symbol, timeframe)`.
///
/// Invariant: timestamps strictly increasing, gaps permitted only for
/// known market-closed periods. Owned by the cache; analyzers only ever see
/// borrowed tails of this structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleWindow {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
}

impl CandleWindow {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            candles,
        }
    }

    pub fn empty(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self::new(symbol, timeframe, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// A read-only tail view of up to `count` most recent candles.
    pub fn tail(&self, count: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(count);
        &self.candles[start..]
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Merge `incoming` candles into this window, deduping by timestamp and
    /// keeping the result sorted ascending. Used by the cache's incremental
    /// top-up fetch.
    pub fn merge(&mut self, incoming: Vec<Candle>) {
        for candle in incoming {
            match self.candles.binary_search_by_key(&candle.timestamp, |c| c.timestamp) {
                Ok(idx) => self.candles[idx] = candle,
                Err(idx) => self.candles.insert(idx, candle),
            }
        }
    }

    /// Forward-fills OHLC gaps, zero-fills missing volume, and back-fills any
    /// residual leading gap from the first valid candle.
    pub fn handle_missing(&mut self) {
        if self.candles.is_empty() {
            return;
        }

        let mut last_good: Option<Candle> = None;
        for candle in self.candles.iter_mut() {
            if !candle.is_valid() {
                if let Some(prev) = last_good {
                    candle.open = prev.close;
                    candle.high = prev.close;
                    candle.low = prev.close;
                    candle.close = prev.close;
                    candle.tick_volume = 0;
                    candle.real_volume = 0;
                }
            }
            last_good = Some(*candle);
        }

        // Back-fill any still-invalid leading candles from the first valid one.
        if let Some(first_valid) = self.candles.iter().find(|c| c.is_valid()).copied() {
            for candle in self.candles.iter_mut() {
                if !candle.is_valid() {
                    candle.open = first_valid.open;
                    candle.high = first_valid.open;
                    candle.low = first_valid.open;
                    candle.close = first_valid.open;
                    candle.tick_volume = 0;
                    candle.real_volume = 0;
                } else {
                    break;
                }
            }
        }
    }

    /// `(ok, reason)`; reasons cover empty data, insufficient count, and a
    /// stale (>24h old) latest candle.
    pub fn check_sufficiency(&self, min_candles: usize) -> (bool, Option<String>) {
        if self.candles.is_empty() {
            return (false, Some("empty window".to_string()));
        }
        if self.candles.len() < min_candles {
            return (
                false,
                Some(format!(
                    "insufficient candles: {} < {}",
                    self.candles.len(),
                    min_candles
                )),
            );
        }
        let last_ts = self.candles.last().expect("checked non-empty above").timestamp;
        let now_ms = crate::domain::clock::now_millis();
        if now_ms - last_ts > 24 * 60 * 60 * 1000 {
            return (false, Some("latest candle is stale (>24h old)".to_string()));
        }
        (true, None)
    }
}
