//! Time utilities

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Get current UTC time
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a datetime string
///
/// Accepts RFC 3339, naive `YYYY-MM-DDThh:mm[:ss[.ffffff]]` (taken as UTC,
/// `T` or a space as separator) and bare dates (midnight UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|naive| naive.and_utc())
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2024-01-15T12:00:00Z");
        assert!(dt.is_some());

        let offset = parse_datetime("2024-01-15T12:00:00+02:00").unwrap();
        assert_eq!(offset.hour(), 10);

        let naive = parse_datetime("2024-01-15T12:30").unwrap();
        assert_eq!(naive.minute(), 30);

        let date_only = parse_datetime("2020-01-01").unwrap();
        assert_eq!((date_only.year(), date_only.hour()), (2020, 0));

        let invalid = parse_datetime("not a date");
        assert!(invalid.is_none());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("1999-12-31"), NaiveDate::from_ymd_opt(1999, 12, 31));
        assert!(parse_date("31/12/1999").is_none());
    }
}
