//! Timestamp utilities
//!
//! Telemetry rows carry local wall-clock timestamps; daily grouping is by
//! local calendar date.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Storage format for local wall-clock timestamps
pub const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wire format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Get current local timestamp
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Today's local calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` date string
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Format a local wall-clock timestamp for storage
pub fn format_local(ts: &NaiveDateTime) -> String {
    ts.format(LOCAL_TIMESTAMP_FORMAT).to_string()
}

/// Convert seconds to duration
pub fn secs_to_duration(secs: u64) -> std::time::Duration {
    std::time::Duration::from_secs(secs)
}
