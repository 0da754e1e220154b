//! Timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Errors that can occur during timestamp parsing.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The timestamp string is empty.
    #[error("Empty timestamp string")]
    EmptyString,

    /// The timestamp value is invalid.
    #[error("Invalid timestamp: {0}")]
    InvalidFormat(String),
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp as RFC 3339 with millisecond precision and a `Z`
/// suffix, e.g. `2026-10-19T08:30:00.000Z`.
///
/// # Examples
///
/// ```
/// use okrflow::utils::{iso_timestamp, parse_timestamp};
///
/// let ts = parse_timestamp("2026-10-19T08:30:00Z").unwrap();
/// assert_eq!(iso_timestamp(&ts), "2026-10-19T08:30:00.000Z");
/// ```
#[must_use]
pub fn iso_timestamp(at: &Timestamp) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats the calendar date of a timestamp as `YYYY-MM-DD`.
#[must_use]
pub fn date_stamp(at: &Timestamp) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, TimestampError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::EmptyString);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimestampError::InvalidFormat(trimmed.to_string()))
}
