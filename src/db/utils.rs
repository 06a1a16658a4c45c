//! Database utility functions.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::db::{DbError, DbResult};

/// Storage format for every timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current datetime as string in SQLite format
pub fn current_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Render a timestamp in the storage format (second precision, UTC).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp column.
///
/// Accepts the storage format and RFC 3339, since rows written by hand or
/// by other tools sometimes carry the latter.
pub fn parse_timestamp(raw: &str) -> DbResult<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidData {
            message: format!("Unparseable timestamp '{}': {}", raw, e),
            help: format!("Timestamps are stored as '{}'", TIMESTAMP_FORMAT),
        })
}

/// Parse an optional timestamp column.
pub fn parse_optional_timestamp(raw: Option<String>) -> DbResult<Option<DateTime<Utc>>> {
    raw.filter(|s| !s.is_empty())
        .map(|s| parse_timestamp(&s))
        .transpose()
}
