//! Timestamp utilities and calendar-month windows
//!
//! Readings are bucketed by the calendar month of their *measurement*
//! timestamp, never by creation time. All timestamps are stored as fixed-width
//! RFC 3339 UTC text so that lexicographic ordering in SQLite matches
//! chronological ordering.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Encode a timestamp for database storage.
///
/// Fixed-width (microsecond precision, `Z` suffix) so TEXT comparison and
/// `ORDER BY` behave chronologically.
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a timestamp from database storage
pub fn from_db(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Timestamp(format!("{}: {}", raw, e)))
}

/// Half-open calendar-month window containing `ts`:
/// `[first instant of month, first instant of next month)`
pub fn month_window(ts: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (year, month) = (ts.year(), ts.month());
    let start = first_instant(year, month)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = first_instant(next_year, next_month)?;
    Ok((start, end))
}

/// `YYYY-MM` bucket key for a measurement timestamp
pub fn month_bucket(ts: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", ts.year(), ts.month())
}

fn first_instant(year: i32, month: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| Error::Timestamp(format!("no first instant for {:04}-{:02}", year, month)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> DateTime<Utc> {
        from_db(raw).unwrap()
    }

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_month_window_mid_month() {
        let (start, end) = month_window(ts("2024-08-15T14:55:00.000000Z")).unwrap();
        assert_eq!(to_db(&start), "2024-08-01T00:00:00.000000Z");
        assert_eq!(to_db(&end), "2024-09-01T00:00:00.000000Z");
    }

    #[test]
    fn test_month_window_first_instant_is_inside() {
        let first = ts("2024-08-01T00:00:00.000000Z");
        let (start, end) = month_window(first).unwrap();
        assert!(start <= first && first < end);
    }

    #[test]
    fn test_month_window_december_rolls_into_next_year() {
        let (start, end) = month_window(ts("2023-12-31T23:59:59.000000Z")).unwrap();
        assert_eq!(to_db(&start), "2023-12-01T00:00:00.000000Z");
        assert_eq!(to_db(&end), "2024-01-01T00:00:00.000000Z");
    }

    #[test]
    fn test_month_bucket_zero_pads() {
        assert_eq!(month_bucket(ts("2024-08-15T00:00:00.000000Z")), "2024-08");
        assert_eq!(month_bucket(ts("2024-01-02T00:00:00.000000Z")), "2024-01");
    }

    #[test]
    fn test_db_round_trip() {
        let original = ts("2024-08-29T14:55:00.123456Z");
        assert_eq!(from_db(&to_db(&original)).unwrap(), original);
    }

    #[test]
    fn test_db_encoding_is_fixed_width() {
        // Whole-second timestamps still carry the fractional part, so TEXT
        // ordering in SQLite stays chronological.
        let a = to_db(&ts("2024-08-15T10:00:00.000000Z"));
        let b = to_db(&ts("2024-08-15T10:00:00.500000Z"));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_from_db_rejects_garbage() {
        assert!(from_db("last tuesday").is_err());
        assert!(from_db("").is_err());
    }

    #[test]
    fn test_from_db_normalizes_offsets_to_utc() {
        let offset = from_db("2024-08-15T12:00:00+03:00").unwrap();
        assert_eq!(to_db(&offset), "2024-08-15T09:00:00.000000Z");
    }
}
