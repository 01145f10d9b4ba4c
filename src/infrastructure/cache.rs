//! Intelligent per-`(symbol, timeframe)` candle cache sitting in front of
//! the bridge port. The staleness-aware `CacheEntry` is the cache's core
//! invariant; `is_timeframe_available`/`check_data_sufficiency` are folded
//! in as methods on the same type. The incremental top-up fetch path
//! compares against a recent-count/staleness threshold rather than always
//! forcing a full refresh.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::clock::now_millis;
use crate::domain::errors::ErrorKind;
use crate::domain::market::candle::CandleWindow;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::MarketDataPort;
use crate::infrastructure::observability::metrics::Metrics;

/// How stale a cache entry may get, as a multiple of its timeframe's
/// duration, before a full refresh is forced instead of a top-up.
const STALENESS_FACTOR_DEFAULT: f64 = 1.5;

/// Mandatory full refresh cadence regardless of staleness, mirroring the
/// source's `_full_refresh_minutes`.
const FULL_REFRESH_INTERVAL_MINS_DEFAULT: i64 = 60;

struct CacheEntry {
    window: CandleWindow,
    cached_at_ms: i64,
    last_full_refresh_ms: i64,
}

impl CacheEntry {
    /// Data is stale if the latest candle is older than
    /// `staleness_factor * timeframe_duration`.
    fn is_stale(&self, now_ms: i64, staleness_factor: f64) -> bool {
        match self.window.last() {
            None => true,
            Some(last) => {
                let threshold_ms = (self.window.timeframe.to_seconds() as f64 * 1000.0 * staleness_factor) as i64;
                now_ms - last.timestamp > threshold_ms
            }
        }
    }

    fn needs_full_refresh(&self, now_ms: i64, full_refresh_interval_mins: i64) -> bool {
        now_ms - self.last_full_refresh_ms > full_refresh_interval_mins * 60 * 1000
    }
}

/// Caches candle windows keyed by `(symbol, timeframe)`, refreshing from a
/// [`MarketDataPort`] with staleness-aware top-ups and a mandatory periodic
/// full refresh.
pub struct MarketDataCache {
    port: Arc<dyn MarketDataPort>,
    entries: RwLock<HashMap<(String, Timeframe), RwLock<CacheEntry>>>,
    staleness_factor: f64,
    full_refresh_interval_mins: i64,
    metrics: Option<Arc<Metrics>>,
}

impl MarketDataCache {
    pub fn new(port: Arc<dyn MarketDataPort>) -> Self {
        Self {
            port,
            entries: RwLock::new(HashMap::new()),
            staleness_factor: STALENESS_FACTOR_DEFAULT,
            full_refresh_interval_mins: FULL_REFRESH_INTERVAL_MINS_DEFAULT,
            metrics: None,
        }
    }

    pub fn with_policy(port: Arc<dyn MarketDataPort>, staleness_factor: f64, full_refresh_interval_mins: i64) -> Self {
        Self {
            port,
            entries: RwLock::new(HashMap::new()),
            staleness_factor,
            full_refresh_interval_mins,
            metrics: None,
        }
    }

    /// Attaches a metrics sink; cache hit/top-up/full-refresh counters are
    /// only recorded once this is set, keeping the plain constructors usable
    /// in tests that don't care about observability.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns a fresh-enough candle window for `symbol`/`timeframe`,
    /// fetching from the bridge as needed. `force_refresh` always performs a
    /// full fetch regardless of cache state.
    pub async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: u32,
        force_refresh: bool,
    ) -> Result<CandleWindow, ErrorKind> {
        let key = (symbol.to_string(), timeframe);
        let now_ms = now_millis();

        if !force_refresh {
            let entries = self.entries.read().await;
            if let Some(entry_lock) = entries.get(&key) {
                let entry = entry_lock.read().await;
                if !entry.is_stale(now_ms, self.staleness_factor)
                    && !entry.needs_full_refresh(now_ms, self.full_refresh_interval_mins)
                {
                    debug!(symbol, %timeframe, "serving cached candles");
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_cache_hit(symbol, &timeframe.to_string());
                    }
                    return Ok(entry.window.clone());
                }
            }
        }

        let existing_cached = {
            let entries = self.entries.read().await;
            entries.get(&key).is_some()
        };

        let need_full = force_refresh || !existing_cached || {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry_lock) => {
                    let entry = entry_lock.read().await;
                    entry.needs_full_refresh(now_ms, self.full_refresh_interval_mins)
                }
                None => true,
            }
        };

        if need_full {
            let fetched = self.port.copy_rates_from_pos(symbol, timeframe, 0, count).await?;
            let mut window = CandleWindow::new(symbol, timeframe, fetched);
            window.handle_missing();
            info!(symbol, %timeframe, bars = window.len(), "full refresh");
            if let Some(metrics) = &self.metrics {
                metrics.inc_cache_full_refresh(symbol, &timeframe.to_string());
            }
            self.store(key, window.clone(), now_ms, true).await;
            return Ok(window);
        }

        // Top-up: fetch only the recent tail and merge into the cached window.
        let recent_count = (100u32).max(((count as f64) * 0.05) as u32).min(count);
        let recent = self
            .port
            .copy_rates_from_pos(symbol, timeframe, 0, recent_count)
            .await?;

        let mut entries = self.entries.write().await;
        let entry_lock = entries
            .entry(key.clone())
            .or_insert_with(|| RwLock::new(CacheEntry {
                window: CandleWindow::empty(symbol, timeframe),
                cached_at_ms: now_ms,
                last_full_refresh_ms: now_ms,
            }));
        let mut entry = entry_lock.write().await;
        entry.window.merge(recent);
        entry.window.handle_missing();
        entry.cached_at_ms = now_ms;
        debug!(symbol, %timeframe, bars = entry.window.len(), "top-up refresh");
        if let Some(metrics) = &self.metrics {
            metrics.inc_cache_topup(symbol, &timeframe.to_string());
        }
        Ok(entry.window.clone())
    }

    async fn store(&self, key: (String, Timeframe), window: CandleWindow, now_ms: i64, is_full: bool) {
        let mut entries = self.entries.write().await;
        let last_full_refresh_ms = if is_full {
            now_ms
        } else {
            entries
                .get(&key)
                .map(|_| now_ms)
                .unwrap_or(now_ms)
        };
        entries.insert(
            key,
            RwLock::new(CacheEntry {
                window,
                cached_at_ms: now_ms,
                last_full_refresh_ms,
            }),
        );
    }

    /// Returns the cached window without triggering any fetch, or `None` if
    /// nothing has been cached yet for this key.
    pub async fn get_cached(&self, symbol: &str, timeframe: Timeframe) -> Option<CandleWindow> {
        let entries = self.entries.read().await;
        let entry_lock = entries.get(&(symbol.to_string(), timeframe))?;
        let entry = entry_lock.read().await;
        Some(entry.window.clone())
    }

    /// Clears cached state. `symbol = None` clears everything (e.g. on
    /// account change); `Some(symbol)` clears only that symbol's timeframes.
    pub async fn invalidate(&self, symbol: Option<&str>) {
        let mut entries = self.entries.write().await;
        match symbol {
            Some(sym) => {
                entries.retain(|(s, _), _| s != sym);
                info!(symbol = sym, "invalidated cache");
            }
            None => {
                entries.clear();
                info!("invalidated entire cache");
            }
        }
    }

    /// Probes the bridge for a single most-recent candle to determine
    /// whether `timeframe` is currently available for `symbol`.
    pub async fn is_timeframe_available(&self, symbol: &str, timeframe: Timeframe) -> bool {
        match self.port.copy_rates_from_pos(symbol, timeframe, 0, 1).await {
            Ok(candles) => !candles.is_empty(),
            Err(e) => {
                warn!(symbol, %timeframe, error = %e, "availability check failed");
                false
            }
        }
    }

    /// `(is_sufficient, reason)` for a cached window, reusing
    /// [`CandleWindow::check_sufficiency`].
    pub async fn check_data_sufficiency(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        min_candles: usize,
    ) -> (bool, Option<String>) {
        match self.get_cached(symbol, timeframe).await {
            Some(window) => window.check_sufficiency(min_candles),
            None => (false, Some("no data retrieved - symbol may be invalid or delisted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::account::AccountSnapshot;
    use crate::domain::market::candle::Candle;
    use crate::domain::ports::SymbolInfo;

    struct MockPort {
        call_count: AtomicUsize,
        bars: usize,
    }

    fn make_candles(n: usize, start_ts: i64, step_ms: i64) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                timestamp: start_ts + (i as i64) * step_ms,
                open: Decimal::from(100),
                high: Decimal::from(101),
                low: Decimal::from(99),
                close: Decimal::from(100),
                tick_volume: 10,
                real_volume: 0,
                spread: 1,
            })
            .collect()
    }

    #[async_trait]
    impl MarketDataPort for MockPort {
        async fn initialize(&self) -> Result<(), ErrorKind> {
            Ok(())
        }
        async fn shutdown(&self) {}
        async fn account_info(&self) -> Result<AccountSnapshot, ErrorKind> {
            Err(ErrorKind::NoAccount)
        }
        async fn symbols_list(&self) -> Result<Vec<String>, ErrorKind> {
            Ok(vec![])
        }
        async fn symbol_info(&self, _symbol: &str) -> Result<SymbolInfo, ErrorKind> {
            Err(ErrorKind::NoSymbols)
        }
        async fn copy_rates_from_pos(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _start_pos: u32,
            _count: u32,
        ) -> Result<Vec<Candle>, ErrorKind> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(make_candles(self.bars, now_millis() - 60_000 * self.bars as i64, 60_000))
        }
        async fn copy_rates_from(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _from_millis: i64,
            _count: u32,
        ) -> Result<Vec<Candle>, ErrorKind> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_first_fetch_is_full() {
        let port = Arc::new(MockPort { call_count: AtomicUsize::new(0), bars: 50 });
        let cache = MarketDataCache::new(port.clone());
        let window = cache.get_candles("EURUSD", Timeframe::H1, 500, false).await.unwrap();
        assert_eq!(window.len(), 50);
        assert_eq!(port.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_fetch_within_full_refresh_window_and_fresh_uses_cache() {
        let port = Arc::new(MockPort { call_count: AtomicUsize::new(0), bars: 50 });
        let cache = MarketDataCache::new(port.clone());
        cache.get_candles("EURUSD", Timeframe::H1, 500, false).await.unwrap();
        cache.get_candles("EURUSD", Timeframe::H1, 500, false).await.unwrap();
        assert_eq!(port.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches() {
        let port = Arc::new(MockPort { call_count: AtomicUsize::new(0), bars: 50 });
        let cache = MarketDataCache::new(port.clone());
        cache.get_candles("EURUSD", Timeframe::H1, 500, false).await.unwrap();
        cache.get_candles("EURUSD", Timeframe::H1, 500, true).await.unwrap();
        assert_eq!(port.call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_metrics_record_full_refresh_then_topup() {
        let port = Arc::new(MockPort { call_count: AtomicUsize::new(0), bars: 200 });
        let metrics = Arc::new(Metrics::new().unwrap());
        let cache = MarketDataCache::new(port).with_metrics(metrics.clone());

        cache.get_candles("EURUSD", Timeframe::H1, 500, false).await.unwrap();
        cache.get_candles("EURUSD", Timeframe::H1, 500, true).await.unwrap();

        let rendered = metrics.render();
        assert!(rendered.contains("confluence_cache_full_refreshes_total"));
    }

    #[tokio::test]
    async fn test_invalidate_clears_symbol() {
        let port = Arc::new(MockPort { call_count: AtomicUsize::new(0), bars: 50 });
        let cache = MarketDataCache::new(port.clone());
        cache.get_candles("EURUSD", Timeframe::H1, 500, false).await.unwrap();
        cache.invalidate(Some("EURUSD")).await;
        assert!(cache.get_cached("EURUSD", Timeframe::H1).await.is_none());
    }

    #[tokio::test]
    async fn test_check_data_sufficiency_no_data() {
        let port = Arc::new(MockPort { call_count: AtomicUsize::new(0), bars: 50 });
        let cache = MarketDataCache::new(port);
        let (ok, reason) = cache.check_data_sufficiency("EURUSD", Timeframe::H1, 20).await;
        assert!(!ok);
        assert!(reason.unwrap().contains("no data"));
    }

    #[tokio::test]
    async fn test_is_timeframe_available() {
        let port = Arc::new(MockPort { call_count: AtomicUsize::new(0), bars: 1 });
        let cache = MarketDataCache::new(port);
        assert!(cache.is_timeframe_available("EURUSD", Timeframe::M1).await);
    }
}
