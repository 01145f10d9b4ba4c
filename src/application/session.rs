//! Polls the bridge for account state and turns transitions into typed
//! events via a `tokio::spawn`-ed background task, using channel sends
//! instead of callbacks to report identity changes and significant
//! balance/equity/margin moves.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::domain::account::AccountSnapshot;
use crate::domain::ports::MarketDataPort;

/// Emitted onto the session monitor's event channel.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The connected account identity (login/server/company) changed. Never
    /// fired for the very first snapshot captured after startup — there is
    /// no prior account to have changed from.
    AccountChanged { old: AccountSnapshot, new: AccountSnapshot },
    /// Same account, but balance/equity/margin moved past the significant
    /// thresholds.
    SignificantChange { old: AccountSnapshot, new: AccountSnapshot },
    /// The bridge stopped returning an account (disconnect, logged-out
    /// terminal, etc). Fired once on the transition into disconnected state,
    /// not on every subsequent failed poll.
    Disconnected,
}

/// Background task polling [`MarketDataPort::account_info`] on a fixed
/// cadence and emitting [`SessionEvent`]s on state transitions.
pub struct SessionMonitor {
    port: Arc<dyn MarketDataPort>,
    poll_interval: std::time::Duration,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl SessionMonitor {
    pub fn new(
        port: Arc<dyn MarketDataPort>,
        poll_interval: std::time::Duration,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self { port, poll_interval, event_tx }
    }

    /// Runs the poll loop until `stop_rx` reports `true`. Intended to be
    /// driven via `tokio::spawn`.
    pub async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let mut last_snapshot: Option<AccountSnapshot> = None;
        let mut interval = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        info!("session monitor stopping");
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.poll_once(&mut last_snapshot).await;
                }
            }
        }
    }

    async fn poll_once(&self, last_snapshot: &mut Option<AccountSnapshot>) {
        match self.port.account_info().await {
            Err(e) => {
                if last_snapshot.take().is_some() {
                    warn!(error = %e, "bridge disconnected");
                    let _ = self.event_tx.send(SessionEvent::Disconnected).await;
                }
            }
            Ok(snapshot) => {
                let old = last_snapshot.replace(snapshot.clone());

                match old {
                    None => {
                        // First snapshot: establishes identity, never fires a
                        // change event.
                    }
                    Some(old) if !snapshot.is_same_account(&old) => {
                        warn!(
                            old_login = old.login,
                            new_login = snapshot.login,
                            server = %snapshot.server,
                            "account changed"
                        );
                        let _ = self
                            .event_tx
                            .send(SessionEvent::AccountChanged { old, new: snapshot })
                            .await;
                    }
                    Some(old) if snapshot.has_changed_significantly(&old) => {
                        let _ = self
                            .event_tx
                            .send(SessionEvent::SignificantChange { old, new: snapshot })
                            .await;
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use crate::domain::market::candle::Candle;
    use crate::domain::market::timeframe::Timeframe;
    use crate::domain::ports::SymbolInfo;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct ScriptedPort {
        responses: Mutex<Vec<Result<AccountSnapshot, ErrorKind>>>,
    }

    #[async_trait]
    impl MarketDataPort for ScriptedPort {
        async fn initialize(&self) -> Result<(), ErrorKind> {
            Ok(())
        }
        async fn shutdown(&self) {}
        async fn account_info(&self) -> Result<AccountSnapshot, ErrorKind> {
            self.responses.lock().unwrap().remove(0)
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
            Ok(vec![])
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

    fn account(login: u64, balance: Decimal, equity: Decimal, margin: Decimal) -> AccountSnapshot {
        AccountSnapshot {
            login,
            server: "Broker-Live".to_string(),
            name: "Trader".to_string(),
            company: "Broker".to_string(),
            currency: "USD".to_string(),
            balance,
            equity,
            margin_level: margin,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_first_snapshot_fires_no_event() {
        use rust_decimal_macros::dec;
        let port = Arc::new(ScriptedPort {
            responses: Mutex::new(vec![Ok(account(1, dec!(1000), dec!(1000), dec!(200)))]),
        });
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = SessionMonitor::new(port, std::time::Duration::from_millis(10), tx);
        let mut last = None;
        monitor.poll_once(&mut last).await;
        drop(monitor);
        assert!(rx.try_recv().is_err());
        assert!(last.is_some());
    }

    #[tokio::test]
    async fn test_account_change_fires_after_first_snapshot() {
        use rust_decimal_macros::dec;
        let port = Arc::new(ScriptedPort {
            responses: Mutex::new(vec![
                Ok(account(1, dec!(1000), dec!(1000), dec!(200))),
                Ok(account(2, dec!(1000), dec!(1000), dec!(200))),
            ]),
        });
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = SessionMonitor::new(port, std::time::Duration::from_millis(10), tx);
        let mut last = None;
        monitor.poll_once(&mut last).await;
        monitor.poll_once(&mut last).await;
        let event = rx.try_recv().expect("account change event");
        assert!(matches!(event, SessionEvent::AccountChanged { .. }));
    }

    #[tokio::test]
    async fn test_significant_balance_change_same_account() {
        use rust_decimal_macros::dec;
        let port = Arc::new(ScriptedPort {
            responses: Mutex::new(vec![
                Ok(account(1, dec!(1000), dec!(1000), dec!(200))),
                Ok(account(1, dec!(2000), dec!(2000), dec!(200))),
            ]),
        });
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = SessionMonitor::new(port, std::time::Duration::from_millis(10), tx);
        let mut last = None;
        monitor.poll_once(&mut last).await;
        monitor.poll_once(&mut last).await;
        let event = rx.try_recv().expect("significant change event");
        assert!(matches!(event, SessionEvent::SignificantChange { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_then_reconnect() {
        use rust_decimal_macros::dec;
        let port = Arc::new(ScriptedPort {
            responses: Mutex::new(vec![
                Ok(account(1, dec!(1000), dec!(1000), dec!(200))),
                Err(ErrorKind::NoAccount),
                Ok(account(1, dec!(1000), dec!(1000), dec!(200))),
            ]),
        });
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = SessionMonitor::new(port, std::time::Duration::from_millis(10), tx);
        let mut last = None;
        monitor.poll_once(&mut last).await;
        monitor.poll_once(&mut last).await;
        let event = rx.try_recv().expect("disconnect event");
        assert!(matches!(event, SessionEvent::Disconnected));

        // Reconnect: this is a "first snapshot" again (last was cleared), so
        // no AccountChanged should fire even though login stayed the same.
        monitor.poll_once(&mut last).await;
        assert!(rx.try_recv().is_err());
    }
}
