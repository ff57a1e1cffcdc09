//! Calendar-day helpers for the backfill loop

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Truncate an instant to its UTC calendar day
pub fn utc_day(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// UTC midnight at the start of `day`
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::default()).and_utc()
}

/// Iterator over every calendar day from `start` to `end`, both inclusive
#[derive(Debug, Clone)]
pub struct DayCursor {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DayCursor {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
        }
    }
}

impl Iterator for DayCursor {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current.succ_opt().filter(|d| *d <= self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map(|d| (self.end - d).num_days() as usize + 1)
            .unwrap_or(0);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cursor_inclusive_across_month_end() {
        let days: Vec<_> = DayCursor::new(date(2024, 2, 28), date(2024, 3, 1)).collect();
        assert_eq!(days, vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]);
    }

    #[test]
    fn test_cursor_single_day() {
        let mut cursor = DayCursor::new(date(2024, 5, 5), date(2024, 5, 5));
        assert_eq!(cursor.size_hint(), (1, Some(1)));
        assert_eq!(cursor.next(), Some(date(2024, 5, 5)));
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_cursor_empty_when_start_after_end() {
        assert_eq!(DayCursor::new(date(2024, 5, 6), date(2024, 5, 5)).count(), 0);
    }

    #[test]
    fn test_utc_day_truncates() {
        let instant = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(utc_day(instant), date(2023, 11, 14));
        assert_eq!(day_start(date(2023, 11, 14)).timestamp(), 1_699_920_000);
    }
}
