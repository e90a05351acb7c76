//! Date arithmetic and working-day calendar.
//!
//! Pure helpers over calendar dates (no time component): signed day
//! differences, day-of-week classification, and holiday-aware working-day
//! counting.
//!
//! # Date Model
//! All dates are [`NaiveDate`] values. Lag and durations are calendar-day
//! offsets; only the helpers on [`WorkCalendar`] skip non-working days.
//!
//! # Precedence
//! Holidays and blocked windows override the weekday pattern. A date is a
//! working day iff:
//! - Its weekday is not one of `weekend_days`, AND
//! - It is not in `holidays`, AND
//! - It does NOT fall within any `blocked_periods` entry.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Signed calendar-day difference `to - from`.
#[inline]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Offsets a date by a signed number of calendar days.
///
/// Returns `None` when the result falls outside the representable range.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

/// Whether `date` falls on one of the given weekend days.
#[inline]
pub fn is_weekend(date: NaiveDate, weekend: &[Weekday]) -> bool {
    weekend.contains(&date.weekday())
}

/// An inclusive date interval `[start, end]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    /// First date (inclusive).
    pub start: NaiveDate,
    /// Last date (inclusive).
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a new window.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of calendar days covered (0 for an inverted window).
    #[inline]
    pub fn days(&self) -> i64 {
        (days_between(self.start, self.end) + 1).max(0)
    }

    /// Whether a date falls within this window.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Whether two windows share at least one date.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Project working-day calendar.
///
/// The holiday set is owned by a collaborator and handed in as-is; this
/// type never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// Days of the week that are never worked.
    pub weekend_days: Vec<Weekday>,
    /// Individual non-working dates.
    pub holidays: BTreeSet<NaiveDate>,
    /// Multi-day shutdowns (overrides the weekday pattern).
    pub blocked_periods: Vec<DateWindow>,
    /// How far `next_working_day` scans before giving up.
    pub search_horizon_days: u32,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            holidays: BTreeSet::new(),
            blocked_periods: Vec::new(),
            search_horizon_days: 366,
        }
    }
}

impl WorkCalendar {
    /// Creates a calendar with a Saturday/Sunday weekend and no holidays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calendar where every day is worked.
    pub fn always_working() -> Self {
        Self {
            weekend_days: Vec::new(),
            ..Self::default()
        }
    }

    /// Replaces the weekend days.
    pub fn with_weekend(mut self, days: Vec<Weekday>) -> Self {
        self.weekend_days = days;
        self
    }

    /// Adds a single holiday.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    /// Adds a set of holidays.
    pub fn with_holidays(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(dates);
        self
    }

    /// Adds a blocked period.
    pub fn with_blocked(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.blocked_periods.push(DateWindow::new(start, end));
        self
    }

    /// Whether a date is a working day.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if self.holidays.contains(&date) {
            return false;
        }
        if self.blocked_periods.iter().any(|w| w.contains(date)) {
            return false;
        }
        !is_weekend(date, &self.weekend_days)
    }

    /// Counts working days in `[start, end]` (inclusive on both ends).
    ///
    /// Returns 0 when `end < start`.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if end < start {
            return 0;
        }
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_working_day(*d))
            .count() as u32
    }

    /// Finds the first working day at or after `from`.
    ///
    /// Returns `None` if nothing is found within the search horizon.
    pub fn next_working_day(&self, from: NaiveDate) -> Option<NaiveDate> {
        from.iter_days()
            .take(self.search_horizon_days as usize + 1)
            .find(|d| self.is_working_day(*d))
    }

    /// Advances `n` working days past `from`.
    ///
    /// `n == 0` returns the next working day at or after `from`.
    pub fn add_working_days(&self, from: NaiveDate, n: u32) -> Option<NaiveDate> {
        let mut current = self.next_working_day(from)?;
        for _ in 0..n {
            current = self.next_working_day(current.succ_opt()?)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(d(2024, 3, 1), d(2024, 3, 11)), 10);
        assert_eq!(days_between(d(2024, 3, 11), d(2024, 3, 1)), -10);
        // Leap day
        assert_eq!(days_between(d(2024, 2, 28), d(2024, 3, 1)), 2);
    }

    #[test]
    fn test_add_days() {
        assert_eq!(add_days(d(2024, 1, 30), 2), Some(d(2024, 2, 1)));
        assert_eq!(add_days(d(2024, 1, 1), -1), Some(d(2023, 12, 31)));
        assert_eq!(add_days(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn test_is_weekend() {
        let weekend = [Weekday::Sat, Weekday::Sun];
        assert!(is_weekend(d(2024, 6, 1), &weekend)); // Saturday
        assert!(!is_weekend(d(2024, 6, 3), &weekend)); // Monday
        assert!(!is_weekend(d(2024, 6, 1), &[]));
    }

    #[test]
    fn test_date_window() {
        let w = DateWindow::new(d(2024, 5, 1), d(2024, 5, 10));
        assert_eq!(w.days(), 10);
        assert!(w.contains(d(2024, 5, 1)));
        assert!(w.contains(d(2024, 5, 10))); // inclusive end
        assert!(!w.contains(d(2024, 5, 11)));

        let touching = DateWindow::new(d(2024, 5, 10), d(2024, 5, 20));
        assert!(w.overlaps(&touching));
        let apart = DateWindow::new(d(2024, 5, 11), d(2024, 5, 20));
        assert!(!w.overlaps(&apart));
    }

    #[test]
    fn test_holiday_overrides_weekday() {
        let cal = WorkCalendar::new().with_holiday(d(2024, 5, 1));
        assert!(!cal.is_working_day(d(2024, 5, 1))); // Wednesday holiday
        assert!(cal.is_working_day(d(2024, 5, 2)));
        assert!(!cal.is_working_day(d(2024, 5, 4))); // Saturday
    }

    #[test]
    fn test_working_days_between() {
        // Mon 2024-06-03 .. Sun 2024-06-16: two full weeks
        let cal = WorkCalendar::new().with_holiday(d(2024, 6, 12));
        assert_eq!(cal.working_days_between(d(2024, 6, 3), d(2024, 6, 16)), 9);
        assert_eq!(cal.working_days_between(d(2024, 6, 16), d(2024, 6, 3)), 0);
    }

    #[test]
    fn test_blocked_period() {
        let cal = WorkCalendar::always_working().with_blocked(d(2024, 8, 1), d(2024, 8, 14));
        assert_eq!(cal.working_days_between(d(2024, 7, 30), d(2024, 8, 16)), 4);
        assert_eq!(cal.next_working_day(d(2024, 8, 3)), Some(d(2024, 8, 15)));
    }

    #[test]
    fn test_next_and_add_working_days() {
        let cal = WorkCalendar::new();
        // Friday → already working
        assert_eq!(cal.next_working_day(d(2024, 6, 7)), Some(d(2024, 6, 7)));
        // Saturday → Monday
        assert_eq!(cal.next_working_day(d(2024, 6, 8)), Some(d(2024, 6, 10)));
        // Friday + 1 working day → Monday
        assert_eq!(cal.add_working_days(d(2024, 6, 7), 1), Some(d(2024, 6, 10)));
    }

    #[test]
    fn test_next_working_day_horizon() {
        let mut cal = WorkCalendar::new().with_blocked(d(2024, 1, 1), d(2025, 12, 31));
        cal.search_horizon_days = 30;
        assert_eq!(cal.next_working_day(d(2024, 1, 1)), None);
    }
}
