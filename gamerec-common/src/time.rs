//! Timestamp utilities

use chrono::{DateTime, Datelike, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current calendar year (UTC)
///
/// Feature extraction takes the year as an explicit input; this is the default
/// used by the binaries when `--reference-year` is not given.
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}
