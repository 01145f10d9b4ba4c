use async_trait::async_trait;

use crate::domain::account::AccountSnapshot;
use crate::domain::errors::ErrorKind;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;

/// Basic static facts about a tradable symbol, as reported by the bridge.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub name: String,
    pub digits: u32,
    pub point: rust_decimal::Decimal,
    pub visible: bool,
}

/// The bridge's read surface.
///
/// This trait has no method that creates, modifies, or closes an order or
/// position, and it never will: the analysis engine is a read-only observer,
/// and the absence of those methods here is what makes that a fact the
/// compiler checks rather than a rule the engine promises to follow.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Establishes the bridge connection. Called once at startup and again
    /// after a reconnect is requested.
    async fn initialize(&self) -> Result<(), ErrorKind>;

    /// Tears down the bridge connection. Best-effort; errors are logged, not
    /// propagated, since shutdown happens on the way out regardless.
    async fn shutdown(&self);

    /// The currently connected account, or `ErrorKind::NoAccount` if nothing
    /// is logged in on the other end of the bridge.
    async fn account_info(&self) -> Result<AccountSnapshot, ErrorKind>;

    /// All symbols the bridge currently has in its Market Watch.
    async fn symbols_list(&self) -> Result<Vec<String>, ErrorKind>;

    /// Static metadata for one symbol.
    async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, ErrorKind>;

    /// The `count` most recent closed candles for `symbol`/`timeframe`,
    /// oldest first.
    async fn copy_rates_from_pos(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: u32,
        count: u32,
    ) -> Result<Vec<Candle>, ErrorKind>;

    /// Candles for `symbol`/`timeframe` starting at or after `from_millis`,
    /// oldest first.
    async fn copy_rates_from(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from_millis: i64,
        count: u32,
    ) -> Result<Vec<Candle>, ErrorKind>;
}
