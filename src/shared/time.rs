use chrono::{DateTime, Utc};
use std::time::Duration;

/// Current wall-clock time in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Converts a `Duration` into fractional milliseconds.
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Subtracts a `Duration` from a UTC timestamp, saturating at the minimum
/// representable instant.
pub fn utc_minus(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
