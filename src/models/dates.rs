//! Plan and actual dates of a schedulable unit.
//!
//! Dates are owned by the work-management subsystem; the engine only
//! reads them. Every field is optional because a work may be entered
//! before it is planned, and planned long before it actually starts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::days_between;

/// Which end of a work a dependency looks at or bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// The work's start date.
    Start,
    /// The work's finish date.
    Finish,
}

/// Which pair of dates an anomaly was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatePair {
    /// `plan_start` / `plan_end`.
    Plan,
    /// `actual_start` / `actual_end`.
    Actual,
}

/// Plan and actual dates for one work or section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDates {
    /// Planned start.
    pub plan_start: Option<NaiveDate>,
    /// Planned finish.
    pub plan_end: Option<NaiveDate>,
    /// Recorded start.
    pub actual_start: Option<NaiveDate>,
    /// Recorded finish.
    pub actual_end: Option<NaiveDate>,
}

impl ScheduleDates {
    /// Creates an empty (undated) record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record with only planned dates.
    pub fn planned(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            plan_start: Some(start),
            plan_end: Some(end),
            ..Self::default()
        }
    }

    /// Sets the planned start.
    pub fn with_plan_start(mut self, date: NaiveDate) -> Self {
        self.plan_start = Some(date);
        self
    }

    /// Sets the planned finish.
    pub fn with_plan_end(mut self, date: NaiveDate) -> Self {
        self.plan_end = Some(date);
        self
    }

    /// Sets the actual start.
    pub fn with_actual_start(mut self, date: NaiveDate) -> Self {
        self.actual_start = Some(date);
        self
    }

    /// Sets the actual finish.
    pub fn with_actual_end(mut self, date: NaiveDate) -> Self {
        self.actual_end = Some(date);
        self
    }

    /// Effective start: actual if recorded, else planned.
    pub fn start(&self) -> Option<NaiveDate> {
        self.actual_start.or(self.plan_start)
    }

    /// Effective finish: actual if recorded, else planned.
    pub fn finish(&self) -> Option<NaiveDate> {
        self.actual_end.or(self.plan_end)
    }

    /// Effective date of the given endpoint.
    pub fn endpoint(&self, endpoint: Endpoint) -> Option<NaiveDate> {
        match endpoint {
            Endpoint::Start => self.start(),
            Endpoint::Finish => self.finish(),
        }
    }

    /// Planned duration in calendar days (`plan_end - plan_start`).
    ///
    /// `None` when either planned date is missing or the pair is inverted;
    /// an inverted plan is never "corrected" into a guessed duration.
    pub fn planned_duration_days(&self) -> Option<i64> {
        let (start, end) = (self.plan_start?, self.plan_end?);
        let days = days_between(start, end);
        (days >= 0).then_some(days)
    }

    /// Date pairs whose start is after their end.
    pub fn inverted_pairs(&self) -> Vec<DatePair> {
        let mut pairs = Vec::new();
        if let (Some(s), Some(e)) = (self.plan_start, self.plan_end) {
            if s > e {
                pairs.push(DatePair::Plan);
            }
        }
        if let (Some(s), Some(e)) = (self.actual_start, self.actual_end) {
            if s > e {
                pairs.push(DatePair::Actual);
            }
        }
        pairs
    }

    /// Whether no date at all has been entered.
    pub fn is_empty(&self) -> bool {
        self.plan_start.is_none()
            && self.plan_end.is_none()
            && self.actual_start.is_none()
            && self.actual_end.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    #[test]
    fn test_actual_overrides_plan() {
        let dates = ScheduleDates::planned(d(1), d(10)).with_actual_start(d(3));
        assert_eq!(dates.start(), Some(d(3)));
        assert_eq!(dates.finish(), Some(d(10)));
        assert_eq!(dates.endpoint(Endpoint::Finish), Some(d(10)));
    }

    #[test]
    fn test_empty_dates() {
        let dates = ScheduleDates::new();
        assert!(dates.is_empty());
        assert_eq!(dates.start(), None);
        assert_eq!(dates.finish(), None);
        assert_eq!(dates.planned_duration_days(), None);
    }

    #[test]
    fn test_planned_duration() {
        assert_eq!(ScheduleDates::planned(d(1), d(11)).planned_duration_days(), Some(10));
        assert_eq!(ScheduleDates::planned(d(5), d(5)).planned_duration_days(), Some(0));
        assert_eq!(ScheduleDates::new().with_plan_start(d(1)).planned_duration_days(), None);
    }

    #[test]
    fn test_inverted_plan_has_unknown_duration() {
        let dates = ScheduleDates::planned(d(12), d(2));
        assert_eq!(dates.planned_duration_days(), None);
        assert_eq!(dates.inverted_pairs(), vec![DatePair::Plan]);
    }

    #[test]
    fn test_inverted_actual() {
        let dates = ScheduleDates::planned(d(1), d(5))
            .with_actual_start(d(9))
            .with_actual_end(d(8));
        assert_eq!(dates.inverted_pairs(), vec![DatePair::Actual]);
    }
}
