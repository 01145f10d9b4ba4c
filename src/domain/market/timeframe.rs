use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A discrete candle interval, totally ordered by duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
    MN1,
}

impl Timeframe {
    /// Returns the duration of this timeframe in minutes
    pub fn to_minutes(&self) -> usize {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
            Timeframe::W1 => 1440 * 7,
            Timeframe::MN1 => 1440 * 30,
        }
    }

    /// Returns the duration in seconds
    pub fn to_seconds(&self) -> i64 {
        (self.to_minutes() * 60) as i64
    }

    /// Converts to MetaTrader-style granularity string, the lingua franca of the
    /// bridge this system reads from.
    pub fn to_mt_string(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
            Timeframe::W1 => "W1",
            Timeframe::MN1 => "MN1",
        }
    }

    /// Returns all available timeframes in ascending order
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
            Timeframe::W1,
            Timeframe::MN1,
        ]
    }

    /// The timeframes used by default for multi-timeframe sweet-spot search.
    pub fn sweet_spot_defaults() -> Vec<Timeframe> {
        vec![
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ]
    }

    /// Checks if a timestamp aligns with the start of this timeframe period
    ///
    /// # Arguments
    /// * `timestamp_ms` - Unix timestamp in milliseconds
    ///
    /// # Returns
    /// `true` if this timestamp represents the start of a new period for this timeframe
    pub fn is_period_start(&self, timestamp_ms: i64) -> bool {
        let timestamp_sec = timestamp_ms / 1000;
        let period_sec = self.to_seconds();

        match self {
            Timeframe::D1 | Timeframe::W1 | Timeframe::MN1 => {
                let seconds_since_midnight = timestamp_sec % 86400;
                seconds_since_midnight == 0
            }
            _ => timestamp_sec % period_sec == 0,
        }
    }

    /// Returns the start timestamp of the period containing the given timestamp
    ///
    /// # Arguments
    /// * `timestamp_ms` - Unix timestamp in milliseconds
    ///
    /// # Returns
    /// The start timestamp (in ms) of the period containing this timestamp
    pub fn period_start(&self, timestamp_ms: i64) -> i64 {
        let timestamp_sec = timestamp_ms / 1000;
        let period_sec = self.to_seconds();

        let period_start_sec = match self {
            Timeframe::D1 | Timeframe::W1 | Timeframe::MN1 => {
                timestamp_sec - (timestamp_sec % 86400)
            }
            _ => timestamp_sec - (timestamp_sec % period_sec),
        };

        period_start_sec * 1000
    }

    /// Calculates how many 1-minute candles are needed to warm up `indicator_period`
    /// bars of this timeframe, with a 10% buffer.
    pub fn warmup_candles(&self, indicator_period: usize) -> usize {
        let required = indicator_period * self.to_minutes();
        (required as f64 * 1.1) as usize
    }

    /// Default weight used by the multi-timeframe orchestrator when no override
    /// is supplied. Higher timeframes carry more influence on the merged bias.
    pub fn default_weight(&self) -> rust_decimal::Decimal {
        use rust_decimal_macros::dec;
        match self {
            Timeframe::M1 => dec!(0.6),
            Timeframe::M5 => dec!(0.7),
            Timeframe::M15 => dec!(0.8),
            Timeframe::M30 => dec!(0.85),
            Timeframe::H1 => dec!(0.9),
            Timeframe::H4 => dec!(1.0),
            Timeframe::D1 => dec!(1.1),
            Timeframe::W1 => dec!(1.2),
            Timeframe::MN1 => dec!(1.3),
        }
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "M1" | "1M" | "1MIN" => Ok(Timeframe::M1),
            "M5" | "5M" | "5MIN" => Ok(Timeframe::M5),
            "M15" | "15M" | "15MIN" => Ok(Timeframe::M15),
            "M30" | "30M" | "30MIN" => Ok(Timeframe::M30),
            "H1" | "1H" => Ok(Timeframe::H1),
            "H4" | "4H" => Ok(Timeframe::H4),
            "D1" | "1D" | "DAILY" => Ok(Timeframe::D1),
            "W1" | "1W" | "WEEKLY" => Ok(Timeframe::W1),
            "MN1" | "1MN" | "MONTHLY" => Ok(Timeframe::MN1),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: M1, M5, M15, M30, H1, H4, D1, W1, MN1",
                s
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_mt_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minutes() {
        assert_eq!(Timeframe::M1.to_minutes(), 1);
        assert_eq!(Timeframe::M5.to_minutes(), 5);
        assert_eq!(Timeframe::M15.to_minutes(), 15);
        assert_eq!(Timeframe::M30.to_minutes(), 30);
        assert_eq!(Timeframe::H1.to_minutes(), 60);
        assert_eq!(Timeframe::H4.to_minutes(), 240);
        assert_eq!(Timeframe::D1.to_minutes(), 1440);
        assert_eq!(Timeframe::W1.to_minutes(), 1440 * 7);
        assert_eq!(Timeframe::MN1.to_minutes(), 1440 * 30);
    }

    #[test]
    fn test_ordering() {
        assert!(Timeframe::M1 < Timeframe::H1);
        assert!(Timeframe::H4 < Timeframe::D1);
        assert!(Timeframe::D1 < Timeframe::W1);
        assert!(Timeframe::W1 < Timeframe::MN1);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("m1").unwrap(), Timeframe::M1);
        assert_eq!(Timeframe::from_str("M5").unwrap(), Timeframe::M5);
        assert_eq!(Timeframe::from_str("1h").unwrap(), Timeframe::H1);
        assert_eq!(Timeframe::from_str("H4").unwrap(), Timeframe::H4);
        assert_eq!(Timeframe::from_str("D1").unwrap(), Timeframe::D1);
        assert_eq!(Timeframe::from_str("w1").unwrap(), Timeframe::W1);
        assert_eq!(Timeframe::from_str("MN1").unwrap(), Timeframe::MN1);
        assert!(Timeframe::from_str("invalid").is_err());
    }

    #[test]
    fn test_period_start() {
        let tf = Timeframe::M5;
        // 2024-01-01 00:00:00 UTC = 1704067200000 ms
        let base = 1704067200000i64;

        assert_eq!(tf.period_start(base), base);
        assert_eq!(tf.period_start(base + 3 * 60 * 1000), base);
        assert_eq!(tf.period_start(base + 5 * 60 * 1000), base + 5 * 60 * 1000);
        assert_eq!(tf.period_start(base + 7 * 60 * 1000), base + 5 * 60 * 1000);
    }

    #[test]
    fn test_is_period_start() {
        let tf = Timeframe::M5;
        let base = 1704067200000i64;

        assert!(tf.is_period_start(base));
        assert!(tf.is_period_start(base + 5 * 60 * 1000));
        assert!(!tf.is_period_start(base + 3 * 60 * 1000));
    }

    #[test]
    fn test_warmup_candles() {
        let tf = Timeframe::M15;
        let warmup = tf.warmup_candles(50);
        // 50 * 15 = 750 minutes, +10% buffer = 825
        assert_eq!(warmup, 825);
    }

    #[test]
    fn test_default_weights_match_orchestrator_table() {
        use rust_decimal_macros::dec;
        assert_eq!(Timeframe::M1.default_weight(), dec!(0.6));
        assert_eq!(Timeframe::H4.default_weight(), dec!(1.0));
        assert_eq!(Timeframe::MN1.default_weight(), dec!(1.3));
    }

    #[test]
    fn test_mt_strings() {
        assert_eq!(Timeframe::M1.to_mt_string(), "M1");
        assert_eq!(Timeframe::H4.to_mt_string(), "H4");
        assert_eq!(Timeframe::MN1.to_mt_string(), "MN1");
    }
}
