// Circuit breaker and retry-with-backoff, shared by every bridge call
pub mod core;

// Push-style health reporting (JSON log lines, no HTTP server)
pub mod observability;

// Per-(symbol, timeframe) candle cache in front of the bridge port
pub mod cache;

// Bounded broadcast channel fanning confluence/session updates out to subscribers
pub mod bus;

// HTTP client implementing MarketDataPort against the terminal bridge process
pub mod bridge;

pub use bridge::TerminalBridge;
pub use bus::{BusMessage, SubscriberBus};
pub use cache::MarketDataCache;
pub use core::{CircuitBreaker, retry_with_backoff};
