//! Timestamp helpers.
//!
//! The store keeps epoch milliseconds; ISO-8601 appears only on the wire.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Formats epoch milliseconds as an ISO-8601 UTC string with millisecond
/// precision, e.g. `2024-05-01T12:34:56.789Z`.
pub fn to_iso(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an ISO-8601 cursor into epoch milliseconds.
///
/// Malformed input degrades to the epoch so that an agent with a corrupt
/// or missing cursor recovers by requesting the full backlog.
pub fn parse_iso_or_epoch(iso: &str) -> i64 {
    DateTime::parse_from_rfc3339(iso.trim())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_round_trip() {
        let ms = 1_714_567_890_123;
        let iso = to_iso(ms);
        assert!(iso.ends_with('Z'));
        assert_eq!(parse_iso_or_epoch(&iso), ms);
    }

    #[test]
    fn malformed_cursor_degrades_to_epoch() {
        assert_eq!(parse_iso_or_epoch("not-a-date"), 0);
        assert_eq!(parse_iso_or_epoch(""), 0);
    }

    #[test]
    fn epoch_formats() {
        assert_eq!(to_iso(0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn offset_input_normalizes_to_utc_millis() {
        let ms = parse_iso_or_epoch("1970-01-01T01:00:00+01:00");
        assert_eq!(ms, 0);
    }
}
