//! Thin wrapper around the wall clock so staleness checks have one seam to
//! mock from in tests.

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
