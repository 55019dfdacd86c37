//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch for a timestamp
pub fn to_epoch_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Timestamp from milliseconds since the Unix epoch
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
