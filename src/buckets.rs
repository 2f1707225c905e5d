// Month column generation.
use crate::error::{MatrixError, Result};
use crate::types::{MonthBucket, Window, WindowMode};
use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, warn};

/// Validate a start month/year pair.
///
/// The year must leave room for a twelve month window inside the calendar
/// range chrono can represent.
pub fn start_bucket(start_month: u32, start_year: i32) -> Result<MonthBucket> {
    if start_year <= 0 {
        return Err(MatrixError::InvalidRange(format!(
            "start year must be a positive integer, got {start_year}"
        )));
    }
    let max_year = NaiveDate::MAX.year() - 1;
    if start_year > max_year {
        return Err(MatrixError::InvalidRange(format!(
            "start year must be at most {max_year}, got {start_year}"
        )));
    }
    MonthBucket::new(start_year, start_month).ok_or_else(|| {
        MatrixError::InvalidRange(format!(
            "start month must be between 1 and 12, got {start_month}"
        ))
    })
}

/// Inclusive window covered by the headers, evaluated against `today`.
pub fn window_at(
    start_month: u32,
    start_year: i32,
    mode: WindowMode,
    today: NaiveDate,
) -> Result<Window> {
    let start = start_bucket(start_month, start_year)?;
    let end = match mode {
        WindowMode::RollingToNow => MonthBucket::from_date(&today),
        WindowMode::Fixed12 => start.plus_months(11),
    };
    Ok(Window::new(start, end))
}

/// Every month from the window start through its end, inclusive.
///
/// An inverted window (start after end) yields no months.
pub fn buckets_in(window: Window) -> Vec<MonthBucket> {
    if window.is_empty() {
        warn!(
            start = %window.start,
            end = %window.end,
            "Start month is after the end of the window; no month columns"
        );
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut current = window.start;
    while current <= window.end {
        out.push(current);
        current = current.next();
    }
    debug!(
        count = out.len(),
        first = %window.start,
        last = %window.end,
        "Generated month buckets"
    );
    out
}

/// Like [`generate_buckets`] but with an explicit "today".
pub fn generate_buckets_at(
    start_month: u32,
    start_year: i32,
    mode: WindowMode,
    today: NaiveDate,
) -> Result<Vec<MonthBucket>> {
    let window = window_at(start_month, start_year, mode, today)?;
    Ok(buckets_in(window))
}

/// Ordered month columns from the start month to the end boundary of `mode`.
///
/// `RollingToNow` ends at the current local calendar month, `Fixed12` ends
/// eleven months after the start.
pub fn generate_buckets(
    start_month: u32,
    start_year: i32,
    mode: WindowMode,
) -> Result<Vec<MonthBucket>> {
    generate_buckets_at(start_month, start_year, mode, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rolling_ends_at_current_month() {
        let buckets =
            generate_buckets_at(11, 2022, WindowMode::RollingToNow, date(2023, 2, 17)).unwrap();
        let labels: Vec<String> = buckets.iter().map(|b| b.label()).collect();
        assert_eq!(labels, vec!["Nov 2022", "Dec 2022", "Jan 2023", "Feb 2023"]);
    }

    #[test]
    fn test_rolling_is_gap_free_and_increasing() {
        for start_month in 1..=12 {
            let buckets =
                generate_buckets_at(start_month, 2019, WindowMode::RollingToNow, date(2024, 6, 1))
                    .unwrap();
            assert_eq!(buckets.first().unwrap().month, start_month);
            assert_eq!(*buckets.last().unwrap(), MonthBucket::new(2024, 6).unwrap());
            for pair in buckets.windows(2) {
                assert!(pair[0] < pair[1]);
                assert_eq!(pair[0].next(), pair[1]);
            }
        }
    }

    #[test]
    fn test_rolling_with_live_clock() {
        let buckets = generate_buckets(1, 2000, WindowMode::RollingToNow).unwrap();
        let now = MonthBucket::from_date(&Local::now().date_naive());
        assert_eq!(*buckets.last().unwrap(), now);
    }

    #[test]
    fn test_fixed12_has_twelve_buckets() {
        for start_month in 1..=12 {
            let buckets =
                generate_buckets_at(start_month, 2021, WindowMode::Fixed12, date(2000, 1, 1))
                    .unwrap();
            assert_eq!(buckets.len(), 12);
        }
        let buckets = generate_buckets_at(3, 2023, WindowMode::Fixed12, date(2023, 1, 1)).unwrap();
        assert_eq!(buckets[0].label(), "Mar 2023");
        assert_eq!(buckets[11].label(), "Feb 2024");
    }

    #[test]
    fn test_start_after_now_is_empty() {
        let buckets =
            generate_buckets_at(5, 2030, WindowMode::RollingToNow, date(2026, 10, 1)).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_start_equal_to_now_is_single_bucket() {
        let buckets =
            generate_buckets_at(10, 2026, WindowMode::RollingToNow, date(2026, 10, 31)).unwrap();
        assert_eq!(buckets, vec![MonthBucket::new(2026, 10).unwrap()]);
    }

    #[test]
    fn test_invalid_month() {
        for bad in [0, 13] {
            let err = generate_buckets_at(bad, 2023, WindowMode::Fixed12, date(2023, 1, 1));
            assert!(matches!(err, Err(MatrixError::InvalidRange(_))));
        }
    }

    #[test]
    fn test_invalid_year() {
        for bad in [0, -5] {
            let err = generate_buckets_at(1, bad, WindowMode::RollingToNow, date(2023, 1, 1));
            assert!(matches!(err, Err(MatrixError::InvalidRange(_))));
        }
    }

    #[test]
    fn test_year_too_large() {
        let today = date(2026, 10, 17);
        for mode in [WindowMode::Fixed12, WindowMode::RollingToNow] {
            for month in [1, 12] {
                let err = generate_buckets_at(month, i32::MAX, mode, today);
                assert!(matches!(err, Err(MatrixError::InvalidRange(_))));
            }
        }
        let max_year = NaiveDate::MAX.year() - 1;
        let err = generate_buckets_at(1, max_year + 1, WindowMode::Fixed12, today);
        assert!(matches!(err, Err(MatrixError::InvalidRange(_))));
    }

    #[test]
    fn test_latest_start_year_still_works() {
        let max_year = NaiveDate::MAX.year() - 1;
        let buckets = generate_buckets_at(12, max_year, WindowMode::Fixed12, date(2026, 10, 17))
            .unwrap();
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[11], MonthBucket::new(max_year + 1, 11).unwrap());
    }

    #[test]
    fn test_buckets_in_inverted_window() {
        let window = Window::new(
            MonthBucket::new(2024, 2).unwrap(),
            MonthBucket::new(2024, 1).unwrap(),
        );
        assert!(window.is_empty());
        assert!(buckets_in(window).is_empty());
    }
}
