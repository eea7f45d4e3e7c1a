//! Canonical string forms for date and timestamp columns.
//!
//! The engine stores both as text. Display code only ever sees the normalized
//! forms below, both of which sort lexically in chronological order.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Placeholder shown for values that are missing.
pub const NOT_AVAILABLE: &str = "N/A";

/// Display format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for timestamps (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const STORED_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Parse a timestamp as the engine writes it, or as RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    STORED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Normalize a stored date (or timestamp) to `YYYY-MM-DD`.
///
/// Values that are not recognizable dates pass through unchanged.
pub fn normalize_date(raw: &str) -> String {
    if let Some(date) = parse_date(raw) {
        return date.format(DATE_FORMAT).to_string();
    }
    match parse_timestamp(raw) {
        Some(ts) => ts.date().format(DATE_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Normalize a stored timestamp to `YYYY-MM-DD HH:MM:SS`.
///
/// Values that are not recognizable timestamps pass through unchanged.
pub fn normalize_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Whether a declared SQL column type is date-like.
pub fn is_date_decltype(decl: &str) -> bool {
    let decl = decl.to_ascii_uppercase();
    decl.starts_with("DATE") || decl.starts_with("TIMESTAMP")
}
