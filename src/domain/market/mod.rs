// Candle and candle-window data model
pub mod candle;

// Whole-vector technical indicator primitives
pub mod indicators;

// Trend/volatility regime classification
pub mod market_regime;

// GMT trading-session classification (London/NewYork/Tokyo/Sydney)
pub mod sessions;

// Timeframe enum and its derived metadata
pub mod timeframe;
