//! Small numeric and calendar helpers shared by the per-PR and aggregate calculators.

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, Utc};

/// Median of `values`. Returns 0.0 for an empty slice, the same value the
/// aggregator reports for "no data".
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Fractional hours from `from` to `to`; negative when `to` is earlier.
/// Nanosecond precision, falling back to milliseconds for spans too long to
/// count in nanoseconds.
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let span = to - from;
    match span.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 3_600_000_000_000.0,
        None => span.num_milliseconds() as f64 / 3_600_000.0,
    }
}

/// Largest difference between consecutive instants after sorting ascending.
/// Zero when fewer than two instants are given.
pub fn max_gap_hours(mut instants: Vec<DateTime<Utc>>) -> f64 {
    instants.sort();
    instants
        .windows(2)
        .map(|pair| hours_between(pair[0], pair[1]))
        .fold(0.0, f64::max)
}

pub fn start_of_day(date: DateTime<Utc>) -> DateTime<Utc> {
    midnight(date.date_naive())
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Monday 00:00:00 of the ISO-8601 week containing `date`.
pub fn iso_week_start(date: DateTime<Utc>) -> DateTime<Utc> {
    // Monday = 1 ... Sunday = 7
    let iso_weekday = date.weekday().number_from_monday();
    start_of_day(date) - Duration::days(i64::from(iso_weekday - 1))
}

/// First and last day (both at 00:00:00) of the calendar month containing `date`.
pub fn month_bounds(date: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = date.date_naive() - Days::new(u64::from(date.day0()));
    // only December of chrono's last representable year has no next month,
    // and its last day is NaiveDate::MAX
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    (midnight(first), midnight(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_median_edge_cases() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[7.5]), 7.5);
        assert_eq!(median(&[1.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn test_median_does_not_require_sorted_input() {
        assert_eq!(median(&[30.0, 10.0, 20.0]), 20.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_hours_between_is_fractional_and_signed() {
        assert_eq!(hours_between(at(2024, 1, 1, 10, 0), at(2024, 1, 1, 11, 30)), 1.5);
        assert_eq!(hours_between(at(2024, 1, 2, 0, 0), at(2024, 1, 1, 0, 0)), -24.0);
    }

    #[test]
    fn test_hours_between_keeps_sub_millisecond_spans() {
        let from = at(2024, 1, 1, 10, 0);
        let hours = hours_between(from, from + Duration::microseconds(400));
        assert!(hours > 0.0);
        assert!((hours * 3600.0 - 0.0004).abs() < 1e-12);
    }

    #[test]
    fn test_max_gap_hours() {
        assert_eq!(max_gap_hours(vec![]), 0.0);
        assert_eq!(max_gap_hours(vec![at(2024, 1, 1, 0, 0)]), 0.0);
        let unordered = vec![
            at(2024, 1, 1, 10, 0),
            at(2024, 1, 1, 0, 0),
            at(2024, 1, 1, 4, 0),
        ];
        assert_eq!(max_gap_hours(unordered), 6.0);
    }

    #[test]
    fn test_iso_week_start_same_for_every_day_of_week() {
        // 2024-01-08 is a Monday
        let monday = at(2024, 1, 8, 0, 0);
        for day in 8..=14 {
            assert_eq!(iso_week_start(at(2024, 1, day, 17, 45)), monday);
        }
    }

    #[test]
    fn test_iso_week_start_sunday_maps_to_previous_monday() {
        let sunday = at(2024, 1, 14, 23, 59);
        assert_eq!(iso_week_start(sunday), at(2024, 1, 8, 0, 0));
    }

    #[test]
    fn test_iso_week_start_across_year_boundary() {
        // 2025-01-01 is a Wednesday in ISO week 2025-W01, which starts 2024-12-30
        assert_eq!(iso_week_start(at(2025, 1, 1, 12, 0)), at(2024, 12, 30, 0, 0));
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(at(2024, 2, 14, 9, 30)),
            (at(2024, 2, 1, 0, 0), at(2024, 2, 29, 0, 0))
        );
        assert_eq!(
            month_bounds(at(2023, 2, 1, 0, 0)),
            (at(2023, 2, 1, 0, 0), at(2023, 2, 28, 0, 0))
        );
        assert_eq!(
            month_bounds(at(2024, 12, 31, 23, 59)),
            (at(2024, 12, 1, 0, 0), at(2024, 12, 31, 0, 0))
        );
        assert_eq!(
            month_bounds(at(2024, 4, 30, 1, 0)),
            (at(2024, 4, 1, 0, 0), at(2024, 4, 30, 0, 0))
        );
    }

    #[test]
    fn test_month_bounds_century_leap_rules() {
        assert_eq!(
            month_bounds(at(2100, 2, 10, 12, 0)),
            (at(2100, 2, 1, 0, 0), at(2100, 2, 28, 0, 0))
        );
        assert_eq!(
            month_bounds(at(2000, 2, 10, 12, 0)),
            (at(2000, 2, 1, 0, 0), at(2000, 2, 29, 0, 0))
        );
    }

    #[test]
    fn test_month_bounds_last_representable_month() {
        let (start, end) = month_bounds(midnight(NaiveDate::MAX));
        assert_eq!(end, midnight(NaiveDate::MAX));
        assert_eq!(start.day(), 1);
        assert_eq!(start.month(), 12);
    }
}
