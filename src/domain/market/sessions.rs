//! GMT trading-session classification, shared by every session-aware
//! analyzer instead of each one re-deriving its own hour bands.
//!
//! The source carries two slightly different hour-band tables across its
//! duplicate `sessions.py` modules, with an inconsistent precedence when
//! bands overlap. Per the spec's resolution of that ambiguity (the
//! documented fallthrough order, not the literal duplicate-file order):
//! London is checked first, then New York, then Tokyo, then Sydney as the
//! fallback for whatever hour remains unclaimed.

use chrono::{DateTime, Timelike, Utc};

/// One of the four major FX trading sessions, classified by GMT hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradingSession {
    London,
    NewYork,
    Tokyo,
    Sydney,
}

impl TradingSession {
    /// Classifies a GMT hour-of-day (`0..=23`) into a session, resolving
    /// overlaps with a fixed precedence: London (08:00-16:30) beats New
    /// York (13:00-22:00) beats Tokyo (21:00-06:00); Sydney is whatever's
    /// left. `minute` only matters for London's 16:30 cutoff.
    pub fn from_gmt_hour(hour: u32, minute: u32) -> Self {
        let in_london = hour >= 8 && (hour < 16 || (hour == 16 && minute <= 30));
        if in_london {
            return TradingSession::London;
        }
        let in_new_york = (13..22).contains(&hour);
        if in_new_york {
            return TradingSession::NewYork;
        }
        let in_tokyo = hour >= 21 || hour < 6;
        if in_tokyo {
            return TradingSession::Tokyo;
        }
        TradingSession::Sydney
    }

    /// Classifies a candle's `timestamp` (epoch millis, assumed UTC/GMT).
    pub fn from_timestamp_millis(timestamp_ms: i64) -> Self {
        let dt: DateTime<Utc> = DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now);
        Self::from_gmt_hour(dt.hour(), dt.minute())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradingSession::London => "London",
            TradingSession::NewYork => "NewYork",
            TradingSession::Tokyo => "Tokyo",
            TradingSession::Sydney => "Sydney",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_london_band() {
        assert_eq!(TradingSession::from_gmt_hour(10, 0), TradingSession::London);
        assert_eq!(TradingSession::from_gmt_hour(16, 30), TradingSession::London);
    }

    #[test]
    fn test_london_new_york_overlap_favors_london() {
        // 13:00-16:30 GMT is the classic London/NY overlap window.
        assert_eq!(TradingSession::from_gmt_hour(14, 0), TradingSession::London);
    }

    #[test]
    fn test_new_york_after_london_close() {
        assert_eq!(TradingSession::from_gmt_hour(18, 0), TradingSession::NewYork);
    }

    #[test]
    fn test_tokyo_wraps_midnight() {
        assert_eq!(TradingSession::from_gmt_hour(23, 0), TradingSession::Tokyo);
        assert_eq!(TradingSession::from_gmt_hour(3, 0), TradingSession::Tokyo);
    }

    #[test]
    fn test_sydney_fallback() {
        assert_eq!(TradingSession::from_gmt_hour(6, 30), TradingSession::Sydney);
    }

    #[test]
    fn test_classification_is_total() {
        for h in 0..24 {
            for m in [0, 30, 59] {
                let _ = TradingSession::from_gmt_hour(h, m);
            }
        }
    }
}
