//! Disabled-date projection for date-entry surfaces.
//!
//! Turns an already-computed minimum permissible date into a predicate a
//! date picker can enforce: every date strictly before the minimum is
//! disabled. This is packaging only; the minimum is never re-derived here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{add_days, DateWindow};

/// Dates a date-entry surface must refuse.
///
/// Serializes as `{"min_date": "2024-05-15"}` (or `null` when nothing is
/// disabled), which is what picker widgets usually take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledDates {
    /// First permissible date; `None` disables nothing.
    pub min_date: Option<NaiveDate>,
}

/// Projects a minimum permissible date into a disabled-date predicate.
pub fn disabled_dates(minimum: Option<NaiveDate>) -> DisabledDates {
    DisabledDates::new(minimum)
}

impl DisabledDates {
    /// Creates the predicate for a minimum date.
    pub fn new(min_date: Option<NaiveDate>) -> Self {
        Self { min_date }
    }

    /// A predicate that disables nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether `date` must be refused.
    #[inline]
    pub fn is_disabled(&self, date: NaiveDate) -> bool {
        self.min_date.is_some_and(|min| date < min)
    }

    /// Whether any date at all is disabled.
    pub fn disables_anything(&self) -> bool {
        self.min_date.is_some()
    }

    /// First date that may be picked (`None` = any).
    pub fn first_enabled(&self) -> Option<NaiveDate> {
        self.min_date
    }

    /// Last refused date (`None` = nothing refused).
    pub fn last_disabled(&self) -> Option<NaiveDate> {
        self.min_date.and_then(|min| add_days(min, -1))
    }

    /// The disabled part of a visible window, for shading a calendar page.
    pub fn disabled_in(&self, window: DateWindow) -> Option<DateWindow> {
        let last = self.last_disabled()?;
        if last < window.start {
            return None;
        }
        Some(DateWindow::new(window.start, last.min(window.end)))
    }
}
