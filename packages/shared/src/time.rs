//! Wall-clock helpers used for informational timestamps (room creation time).
//!
//! Timers that drive the broadcast core use `tokio::time` instead; these
//! helpers only format values for HTTP responses and logs.

use chrono::{FixedOffset, TimeZone, Utc};

/// UTC offset used when rendering timestamps for operators (UTC+5, Almaty).
pub const DISPLAY_OFFSET_SECS: i32 = 5 * 3600;

/// Current Unix timestamp in milliseconds.
pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render a Unix timestamp (milliseconds) as RFC 3339 in the display offset.
///
/// Returns `None` for timestamps chrono cannot represent.
pub fn millis_to_rfc3339(timestamp_millis: i64) -> Option<String> {
    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS)?;
    offset
        .timestamp_millis_opt(timestamp_millis)
        .single()
        .map(|dt| dt.to_rfc3339())
}
