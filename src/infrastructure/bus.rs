//! A bounded, multi-subscriber push channel for confluence results and
//! session transitions. Generalizes a single-purpose
//! `Option<broadcast::Sender<Candle>>` UI-streaming field into a typed
//! message enum with its own dedicated bus type.

use tokio::sync::broadcast;
use tracing::warn;

use crate::application::engine::ConfluenceUpdate;
use crate::domain::account::AccountSnapshot;
use crate::domain::errors::ErrorKind;

/// Default channel capacity for the bounded broadcast
/// contract: slow subscribers drop the oldest messages rather than block the
/// engine.
pub const DEFAULT_CAPACITY: usize = 64;

/// One push message delivered to every subscriber.
#[derive(Debug, Clone)]
pub enum BusMessage {
    /// A fresh multi-timeframe confluence aggregate for one symbol, boxed
    /// since it carries up to 200 raw candles alongside the per-timeframe
    /// breakdown.
    ConfluenceUpdate(Box<ConfluenceUpdate>),
    /// The bridge account/session changed.
    SessionChanged { old: Option<AccountSnapshot>, new: AccountSnapshot },
    /// A subscriber-visible error surfaced by the engine.
    Error(ErrorKind),
    /// This subscriber missed `count` messages because it fell behind the
    /// broadcast buffer; the next message it receives resumes from the
    /// current head, not from where it left off.
    Lagged(u64),
}

/// Thin wrapper over [`tokio::sync::broadcast`] giving subscribers a typed
/// `BusMessage` stream and turning `RecvError::Lagged` into an explicit
/// message instead of a receive error the caller has to special-case.
pub struct SubscriberBus {
    sender: broadcast::Sender<BusMessage>,
}

impl SubscriberBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// A new subscription handle. Each receiver sees every message published
    /// after this call, independent of other subscribers.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver { inner: self.sender.subscribe() }
    }

    /// Publishes to all current subscribers. A `SendError` (no subscribers)
    /// is swallowed: nobody listening is not a failure for the publisher.
    pub fn publish(&self, message: BusMessage) {
        let _ = self.sender.send(message);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SubscriberBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A single subscriber's receive handle.
pub struct BusReceiver {
    inner: broadcast::Receiver<BusMessage>,
}

impl BusReceiver {
    /// Awaits the next message, translating a lag into `BusMessage::Lagged`
    /// instead of propagating `RecvError`. Returns `None` only when the bus
    /// itself has been dropped.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.inner.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "subscriber lagged behind bus");
                    return Some(BusMessage::Lagged(n));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::SetupStatus;
    use crate::domain::confluence::MarketBias;
    use crate::domain::signal::Direction;

    fn sample_update() -> ConfluenceUpdate {
        ConfluenceUpdate {
            symbol: "EURUSD".to_string(),
            timeframe_set: vec![crate::domain::market::timeframe::Timeframe::H1],
            overall_bias: MarketBias::Neutral,
            overall_bullish: Default::default(),
            overall_bearish: Default::default(),
            overall_confidence: Default::default(),
            timeframe_details: vec![],
            top_factors: vec![],
            setup_status: SetupStatus::NoSetup,
            direction: Direction::Neutral,
            raw_candles: vec![],
            session_id: 0,
            warnings: vec![],
        }
    }

    #[tokio::test]
    async fn test_publish_delivers_to_subscriber() {
        let bus = SubscriberBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(BusMessage::ConfluenceUpdate(Box::new(sample_update())));
        let msg = rx.recv().await.expect("message delivered");
        assert!(matches!(msg, BusMessage::ConfluenceUpdate(_)));
    }

    #[tokio::test]
    async fn test_lag_surfaces_as_typed_message() {
        let bus = SubscriberBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(BusMessage::Error(ErrorKind::NoAccount));
        }
        let msg = rx.recv().await.expect("some message delivered");
        assert!(matches!(msg, BusMessage::Lagged(_)));
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_does_not_panic() {
        let bus = SubscriberBus::new(8);
        bus.publish(BusMessage::Error(ErrorKind::NoSymbols));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_get_message() {
        let bus = SubscriberBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.publish(BusMessage::Error(ErrorKind::Cancelled));
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
        assert_eq!(bus.subscriber_count(), 2);
    }
}
