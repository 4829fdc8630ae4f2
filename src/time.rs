//! Time related utils.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::error::{Error, Result};

/// Export DateTime from time crate.
pub type DateTime = time::OffsetDateTime;

/// Date format: "20220313"
const DATE: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");

/// Time format for basic ISO 8601: "20220313T072004Z"
const ISO8601: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

/// Return the current UTC time.
pub fn now() -> DateTime {
    DateTime::now_utc()
}

/// Format a time into an 8-char date stamp like `20220313`.
pub fn format_date(t: DateTime) -> String {
    let s = t.format(DATE).expect("input time must be valid");
    assert_eq!(s.len(), 8, "formatted date stamp must be 8 bytes");
    s
}

/// Format a time into a 16-char basic ISO 8601 timestamp like
/// `20220313T072004Z`.
pub fn format_iso8601(t: DateTime) -> String {
    let s = t.format(ISO8601).expect("input time must be valid");
    assert_eq!(s.len(), 16, "formatted timestamp must be 16 bytes");
    s
}

/// Parse a caller-supplied signing timestamp.
///
/// Only the exact 16-char `YYYYMMDDTHHMMSSZ` form is accepted.
pub fn parse_iso8601(s: &str) -> Result<DateTime> {
    if s.len() != 16 {
        return Err(Error::invalid_format(format!(
            "timestamp {s:?} must be 16 chars of the form YYYYMMDDTHHMMSSZ"
        )));
    }
    let t = PrimitiveDateTime::parse(s, ISO8601)
        .map_err(|e| Error::invalid_format(format!("invalid timestamp {s:?}")).with_source(e))?;
    Ok(t.assume_utc())
}

/// Convert milliseconds since the Unix epoch into a time.
pub fn from_unix_millis(ms: i64) -> Result<DateTime> {
    DateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .map_err(|e| Error::invalid_format(format!("timestamp {ms}ms is out of range")).with_source(e))
}

/// Convert a time into milliseconds since the Unix epoch.
pub fn unix_millis(t: DateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Drop sub-second precision so the signed value matches its formatted form.
pub fn truncate_subsecs(t: DateTime) -> DateTime {
    DateTime::from_unix_timestamp(t.unix_timestamp()).expect("whole seconds must be in range")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_roundtrip() {
        let t = parse_iso8601("20190901T084743Z").unwrap();
        assert_eq!(format_iso8601(t), "20190901T084743Z");
        assert_eq!(format_date(t), "20190901");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for s in [
            "",
            "20190901",
            "2019-09-01T08:47:43Z",
            "20190901T084743",
            "20190901T084743ZZ",
            "20191301T084743Z",
        ] {
            assert!(parse_iso8601(s).is_err(), "{s:?} should be rejected");
        }
    }

    #[test]
    fn test_unix_millis() {
        let t = parse_iso8601("20130524T000000Z").unwrap();
        assert_eq!(unix_millis(t), 1369353600000);
        assert_eq!(from_unix_millis(1369353600000).unwrap(), t);
    }
}
