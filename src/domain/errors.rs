use thiserror::Error;

/// The taxonomy of failures the analysis pipeline can encounter.
///
/// Indicator primitives and analyzers never produce this type directly — it
/// is reserved for the cache, bridge port, session monitor, and engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("bridge unavailable: {reason}")]
    BridgeUnavailable { reason: String },

    #[error("bridge transient failure: {reason}")]
    BridgeTransient { reason: String },

    #[error("no account readable from bridge")]
    NoAccount,

    #[error("bridge returned no symbols")]
    NoSymbols,

    #[error("insufficient data for {symbol} {timeframe}: {reason}")]
    InsufficientData {
        symbol: String,
        timeframe: String,
        reason: String,
    },

    #[error("invalid or unavailable timeframe {timeframe} for {symbol}")]
    InvalidTimeframe { symbol: String, timeframe: String },

    #[error("session changed: {old_session_id} -> {new_session_id}")]
    SessionChanged {
        old_session_id: u64,
        new_session_id: u64,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {context}")]
    Internal { context: String },
}

impl ErrorKind {
    /// Only these variants are surfaced directly to subscribers; every other
    /// variant is attached as a per-timeframe warning on the next update.
    pub fn is_subscriber_visible(&self) -> bool {
        matches!(
            self,
            ErrorKind::BridgeUnavailable { .. }
                | ErrorKind::NoAccount
                | ErrorKind::NoSymbols
                | ErrorKind::SessionChanged { .. }
        )
    }

    /// Whether the retry policy in `infrastructure::core::retry` applies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::BridgeTransient { .. })
    }
}
