//! HTTP client implementing [`MarketDataPort`] against a local terminal
//! bridge process.
//!
//! The analysis engine never talks to the trading terminal directly — a
//! small companion service fronts it and exposes account/symbol/candle data
//! as JSON over HTTP, the same shape REST-backed broker adapters
//! (Alpaca, OANDA) use for their respective brokers. Connection pooling
//! and timeouts are configured the same way: a `reqwest::Client` built
//! once and reused for every call.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::account::AccountSnapshot;
use crate::domain::clock::now_millis;
use crate::domain::errors::ErrorKind;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{MarketDataPort, SymbolInfo};

/// Talks to the terminal bridge over HTTP. One instance is shared across
/// every symbol's [`crate::application::engine::AnalysisEngine`].
pub struct TerminalBridge {
    client: Client,
    base_url: String,
}

impl TerminalBridge {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Maps a transport-level failure to the retryable variant and anything
    /// else (connection refused, DNS failure) to the unavailable variant,
    /// matching the `BridgeTransient` vs `BridgeUnavailable`
    /// split.
    fn map_transport_error(err: reqwest::Error, context: &str) -> ErrorKind {
        if err.is_timeout() || err.is_connect() {
            ErrorKind::BridgeTransient { reason: format!("{context}: {err}") }
        } else {
            ErrorKind::BridgeUnavailable { reason: format!("{context}: {err}") }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    login: u64,
    server: String,
    name: String,
    company: String,
    currency: String,
    balance: Decimal,
    equity: Decimal,
    margin_level: Decimal,
}

#[derive(Debug, Deserialize)]
struct SymbolResponse {
    name: String,
    digits: u32,
    point: Decimal,
    visible: bool,
}

#[derive(Debug, Deserialize)]
struct CandleResponse {
    time: i64,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    tick_volume: u64,
    real_volume: u64,
    spread: u32,
}

impl From<CandleResponse> for Candle {
    fn from(r: CandleResponse) -> Self {
        Candle {
            timestamp: r.time,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            tick_volume: r.tick_volume,
            real_volume: r.real_volume,
            spread: r.spread,
        }
    }
}

#[async_trait]
impl MarketDataPort for TerminalBridge {
    async fn initialize(&self) -> Result<(), ErrorKind> {
        self.client
            .get(self.url("/ping"))
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, "bridge initialize"))?;
        debug!("terminal bridge reachable");
        Ok(())
    }

    async fn shutdown(&self) {
        if let Err(e) = self.client.post(self.url("/shutdown")).send().await {
            warn!(error = %e, "bridge shutdown call failed, ignoring");
        }
    }

    async fn account_info(&self) -> Result<AccountSnapshot, ErrorKind> {
        let resp = self
            .client
            .get(self.url("/account"))
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, "fetch account"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ErrorKind::NoAccount);
        }
        let account: AccountResponse = resp
            .json()
            .await
            .map_err(|e| ErrorKind::Internal { context: format!("parse account response: {e}") })?;

        Ok(AccountSnapshot {
            login: account.login,
            server: account.server,
            name: account.name,
            company: account.company,
            currency: account.currency,
            balance: account.balance,
            equity: account.equity,
            margin_level: account.margin_level,
            timestamp: now_millis(),
        })
    }

    async fn symbols_list(&self) -> Result<Vec<String>, ErrorKind> {
        let resp = self
            .client
            .get(self.url("/symbols"))
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, "fetch symbols"))?;

        let symbols: Vec<SymbolResponse> = resp
            .json()
            .await
            .map_err(|e| ErrorKind::Internal { context: format!("parse symbols response: {e}") })?;

        if symbols.is_empty() {
            return Err(ErrorKind::NoSymbols);
        }
        Ok(symbols.into_iter().map(|s| s.name).collect())
    }

    async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, ErrorKind> {
        let resp = self
            .client
            .get(self.url(&format!("/symbols/{symbol}")))
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, "fetch symbol info"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ErrorKind::NoSymbols);
        }
        let info: SymbolResponse = resp
            .json()
            .await
            .map_err(|e| ErrorKind::Internal { context: format!("parse symbol_info response: {e}") })?;

        Ok(SymbolInfo { name: info.name, digits: info.digits, point: info.point, visible: info.visible })
    }

    async fn copy_rates_from_pos(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: u32,
        count: u32,
    ) -> Result<Vec<Candle>, ErrorKind> {
        let resp = self
            .client
            .get(self.url("/rates"))
            .query(&[
                ("symbol", symbol.to_string()),
                ("timeframe", timeframe.to_mt_string()),
                ("start_pos", start_pos.to_string()),
                ("count", count.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, "fetch rates"))?;

        if resp.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ErrorKind::InvalidTimeframe { symbol: symbol.to_string(), timeframe: timeframe.to_string() });
        }

        let candles: Vec<CandleResponse> = resp
            .json()
            .await
            .context("parse rates response")
            .map_err(|e| ErrorKind::Internal { context: e.to_string() })?;

        Ok(candles.into_iter().map(Candle::from).collect())
    }

    async fn copy_rates_from(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from_millis: i64,
        count: u32,
    ) -> Result<Vec<Candle>, ErrorKind> {
        let resp = self
            .client
            .get(self.url("/rates_from"))
            .query(&[
                ("symbol", symbol.to_string()),
                ("timeframe", timeframe.to_mt_string()),
                ("from_millis", from_millis.to_string()),
                ("count", count.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, "fetch rates_from"))?;

        if resp.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ErrorKind::InvalidTimeframe { symbol: symbol.to_string(), timeframe: timeframe.to_string() });
        }

        let candles: Vec<CandleResponse> = resp
            .json()
            .await
            .context("parse rates_from response")
            .map_err(|e| ErrorKind::Internal { context: e.to_string() })?;

        Ok(candles.into_iter().map(Candle::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_url_joins_base_and_path_without_double_slash() {
        let bridge = TerminalBridge::new("http://127.0.0.1:18812/", Duration::from_secs(5));
        assert_eq!(bridge.url("/account"), "http://127.0.0.1:18812/account");
    }

    #[test]
    fn test_url_without_trailing_slash_is_unaffected() {
        let bridge = TerminalBridge::new("http://127.0.0.1:18812", Duration::from_secs(5));
        assert_eq!(bridge.url("/symbols"), "http://127.0.0.1:18812/symbols");
    }

    #[test]
    fn test_candle_response_conversion_preserves_fields() {
        let resp = CandleResponse {
            time: 1_700_000_000_000,
            open: dec!(1.1000),
            high: dec!(1.1050),
            low: dec!(1.0990),
            close: dec!(1.1020),
            tick_volume: 340,
            real_volume: 0,
            spread: 2,
        };
        let candle: Candle = resp.into();
        assert_eq!(candle.timestamp, 1_700_000_000_000);
        assert_eq!(candle.close, dec!(1.1020));
        assert_eq!(candle.tick_volume, 340);
    }
}
