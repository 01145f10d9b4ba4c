// Account and session identity
pub mod account;

// Wall-clock seam for staleness checks
pub mod clock;

// Weighted signal aggregation into a market bias
pub mod confluence;

// Domain-specific error types
pub mod errors;

// Candle and candlestick-pattern data model, timeframe metadata, regime detection
pub mod market;

// Port interfaces (the bridge's read-only surface)
pub mod ports;

// Analyzer signal vocabulary
pub mod signal;

// Symbol classification
pub mod symbol;
