//! Calendar-aligned query windows.
//!
//! Every window is half-open, `[start, end)`, and is computed from the
//! calendar date of the anchor in the anchor's own UTC offset. Week and month
//! windows additionally require the anchor to sit on the first day of the
//! period.

use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::error::StorageError;
use crate::types::{Anchor, Timestamp};

/// Weekday a calendar week starts on unless configured otherwise.
pub const DEFAULT_FIRST_WEEKDAY: Weekday = Weekday::Mon;

/// A half-open UTC time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t < self.end
    }
}

/// `[midnight(date), midnight(date) + 1 day)`.
pub fn day_window(date: Anchor) -> Result<TimeWindow, StorageError> {
    let day = date.date_naive();
    window(date, day, day.checked_add_days(Days::new(1)))
}

/// `[date, date + 7 days)`; `date` must fall on `first_weekday`.
pub fn week_window(date: Anchor, first_weekday: Weekday) -> Result<TimeWindow, StorageError> {
    let day = date.date_naive();
    if day.weekday() != first_weekday {
        return Err(StorageError::IncorrectStartDate { date: day });
    }
    window(date, day, day.checked_add_days(Days::new(7)))
}

/// `[date, date + 1 calendar month)`; `date` must be the 1st of its month.
pub fn month_window(date: Anchor) -> Result<TimeWindow, StorageError> {
    let day = date.date_naive();
    if day.day() != 1 {
        return Err(StorageError::IncorrectStartDate { date: day });
    }
    window(date, day, day.checked_add_months(Months::new(1)))
}

fn window(
    anchor: Anchor,
    first: NaiveDate,
    next: Option<NaiveDate>,
) -> Result<TimeWindow, StorageError> {
    let out_of_range = || StorageError::IncorrectStartDate { date: first };
    let offset = Duration::seconds(i64::from(anchor.offset().local_minus_utc()));

    let midnight = |day: NaiveDate| {
        day.and_time(NaiveTime::MIN)
            .checked_sub_signed(offset)
            .map(|naive| Utc.from_utc_datetime(&naive))
    };

    let start = midnight(first).ok_or_else(out_of_range)?;
    let end = next.and_then(midnight).ok_or_else(out_of_range)?;
    Ok(TimeWindow { start, end })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{DateTime, FixedOffset};

    use super::*;

    fn anchor(s: &str) -> Anchor {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn utc(s: &str) -> Timestamp {
        anchor(s).with_timezone(&Utc)
    }

    #[test]
    fn day_window_truncates_to_midnight() {
        let w = day_window(anchor("2300-01-01T17:45:00Z")).unwrap();
        assert_eq!(w.start, utc("2300-01-01T00:00:00Z"));
        assert_eq!(w.end, utc("2300-01-02T00:00:00Z"));
        assert!(w.contains(utc("2300-01-01T01:00:00Z")));
        assert!(!w.contains(utc("2300-01-02T00:00:00Z")));
    }

    #[test]
    fn day_window_respects_anchor_offset() {
        let w = day_window(anchor("2300-01-01T01:00:00+03:00")).unwrap();
        assert_eq!(w.start, utc("2299-12-31T21:00:00Z"));
        assert_eq!(w.end, utc("2300-01-01T21:00:00Z"));
    }

    #[test]
    fn week_window_requires_first_weekday() {
        // 2300-01-01 is a Monday.
        let w = week_window(anchor("2300-01-01T00:00:00Z"), Weekday::Mon).unwrap();
        assert_eq!(w.end, utc("2300-01-08T00:00:00Z"));

        assert_matches!(
            week_window(anchor("2300-01-02T00:00:00Z"), Weekday::Mon),
            Err(StorageError::IncorrectStartDate { .. })
        );
        assert!(week_window(anchor("2300-01-07T00:00:00Z"), Weekday::Sun).is_ok());
    }

    #[test]
    fn month_window_follows_gregorian_lengths() {
        let cases = [
            ("2300-01-01T00:00:00Z", "2300-02-01T00:00:00Z"),
            ("2300-02-01T00:00:00Z", "2300-03-01T00:00:00Z"),
            ("2400-02-01T00:00:00Z", "2400-03-01T00:00:00Z"),
            ("2300-04-01T00:00:00Z", "2300-05-01T00:00:00Z"),
            ("2300-12-01T00:00:00Z", "2301-01-01T00:00:00Z"),
        ];
        for (start, end) in cases {
            let w = month_window(anchor(start)).unwrap();
            assert_eq!(w.end, utc(end), "month starting {start}");
        }

        let feb_2300 = month_window(anchor("2300-02-01T00:00:00Z")).unwrap();
        assert_eq!((feb_2300.end - feb_2300.start).num_days(), 28);
        let feb_2400 = month_window(anchor("2400-02-01T00:00:00Z")).unwrap();
        assert_eq!((feb_2400.end - feb_2400.start).num_days(), 29);
    }

    #[test]
    fn month_window_rejects_mid_month_anchor() {
        assert_matches!(
            month_window(anchor("2300-01-02T00:00:00Z")),
            Err(StorageError::IncorrectStartDate { date }) if date.day() == 2
        );
    }

    #[test]
    fn anchor_time_of_day_is_ignored_for_alignment() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let late = offset.with_ymd_and_hms(2300, 1, 1, 23, 59, 59).unwrap();
        assert!(month_window(late).is_ok());
        assert!(week_window(late, Weekday::Mon).is_ok());
    }
}
