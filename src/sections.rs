//! Multi-section works and section progress aggregation.
//!
//! A work with `sections_count > 1` is split into equal sections 1..=N.
//! Each section is its own vertex in the dependency graph, so the graph and
//! evaluator treat sections exactly like whole works; no cross-section
//! coupling exists unless an edge names both sections.
//!
//! # Aggregation
//!
//! | Quantity | Definition |
//! |----------|-----------|
//! | Work progress | mean(section progress), equal weight per section |
//! | Missing section | counts as 0% |
//! | Rounding | half-up to an integer percentage |
//!
//! Work progress is derived, never stored: recompute after any change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DependencyError, ProgressError};
use crate::models::WorkRef;

/// A work item and how many sections it is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionedWork {
    /// Work identifier.
    pub work_id: u64,
    /// Number of sections (0 or 1 = not subdivided).
    pub sections_count: u32,
}

impl SectionedWork {
    /// Creates a work descriptor.
    pub fn new(work_id: u64, sections_count: u32) -> Self {
        Self {
            work_id,
            sections_count,
        }
    }

    /// Whether the work is subdivided.
    #[inline]
    pub fn is_multi_section(&self) -> bool {
        self.sections_count > 1
    }

    /// The schedulable units of this work: each section, or the work itself.
    pub fn section_refs(&self) -> Vec<WorkRef> {
        if self.is_multi_section() {
            (1..=self.sections_count)
                .map(|s| WorkRef::section(self.work_id, s))
                .collect()
        } else {
            vec![WorkRef::work(self.work_id)]
        }
    }

    /// Whether `work` is one of this work's schedulable units.
    ///
    /// The whole-work ref is always accepted.
    pub fn contains(&self, work: WorkRef) -> bool {
        if work.work_id != self.work_id {
            return false;
        }
        match work.section {
            None => true,
            Some(s) => self.is_multi_section() && (1..=self.sections_count).contains(&s),
        }
    }

    /// Checks that `work` addresses an existing section.
    pub fn check_ref(&self, work: WorkRef) -> Result<(), DependencyError> {
        if self.contains(work) || work.work_id != self.work_id {
            Ok(())
        } else {
            Err(DependencyError::SectionOutOfRange {
                work,
                sections_count: self.sections_count,
            })
        }
    }
}

/// Unweighted mean of section percentages, rounded half-up.
///
/// Each input is clamped to 100. Empty input yields 0. The result does not
/// depend on input order.
pub fn aggregated_progress(percentages: &[u8]) -> u8 {
    if percentages.is_empty() {
        return 0;
    }
    let n = percentages.len() as u64;
    let sum: u64 = percentages.iter().map(|&p| u64::from(p.min(100))).sum();
    ((2 * sum + n) / (2 * n)) as u8
}

/// Current progress of each section of one work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionProgress {
    work: SectionedWork,
    percentages: BTreeMap<u32, u8>,
}

impl SectionProgress {
    /// Creates an empty progress table (all sections at 0%).
    pub fn new(work: SectionedWork) -> Self {
        Self {
            work,
            percentages: BTreeMap::new(),
        }
    }

    /// The work this table belongs to.
    pub fn work(&self) -> SectionedWork {
        self.work
    }

    /// Records a section's progress.
    ///
    /// For a work that is not subdivided, use section 1.
    pub fn set(&mut self, section: u32, percent: u8) -> Result<(), ProgressError> {
        let upper = self.work.sections_count.max(1);
        if section == 0 || section > upper {
            return Err(ProgressError::UnknownSection(WorkRef::section(
                self.work.work_id,
                section,
            )));
        }
        if percent > 100 {
            return Err(ProgressError::InvalidPercentage(i32::from(percent)));
        }
        self.record(section, percent);
        Ok(())
    }

    /// Stores an already-validated value.
    pub(crate) fn record(&mut self, section: u32, percent: u8) {
        self.percentages.insert(section, percent.min(100));
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, section: u32, percent: u8) -> Result<Self, ProgressError> {
        self.set(section, percent)?;
        Ok(self)
    }

    /// A section's progress (0 if never recorded).
    pub fn get(&self, section: u32) -> u8 {
        self.percentages.get(&section).copied().unwrap_or(0)
    }

    /// Work-level progress: unweighted mean over all sections.
    pub fn aggregated(&self) -> u8 {
        let sections: Vec<u8> = (1..=self.work.sections_count.max(1))
            .map(|s| self.get(s))
            .collect();
        aggregated_progress(&sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_section_refs() {
        let multi = SectionedWork::new(9, 3);
        assert_eq!(
            multi.section_refs(),
            vec![
                WorkRef::section(9, 1),
                WorkRef::section(9, 2),
                WorkRef::section(9, 3)
            ]
        );
        assert_eq!(SectionedWork::new(9, 1).section_refs(), vec![WorkRef::work(9)]);
        assert_eq!(SectionedWork::new(9, 0).section_refs(), vec![WorkRef::work(9)]);
    }

    #[test]
    fn test_contains_and_check_ref() {
        let w = SectionedWork::new(9, 3);
        assert!(w.contains(WorkRef::work(9)));
        assert!(w.contains(WorkRef::section(9, 3)));
        assert!(!w.contains(WorkRef::section(9, 4)));
        assert!(!w.contains(WorkRef::section(9, 0)));
        assert!(!w.contains(WorkRef::section(8, 1)));

        assert!(w.check_ref(WorkRef::section(9, 2)).is_ok());
        assert_eq!(
            w.check_ref(WorkRef::section(9, 4)),
            Err(DependencyError::SectionOutOfRange {
                work: WorkRef::section(9, 4),
                sections_count: 3
            })
        );
        // Refs to other works are not this work's concern.
        assert!(w.check_ref(WorkRef::section(8, 7)).is_ok());
        // A single-section work has no addressable sections.
        assert!(SectionedWork::new(9, 1).check_ref(WorkRef::section(9, 1)).is_err());
    }

    #[test]
    fn test_aggregation_law() {
        assert_eq!(aggregated_progress(&[0, 50, 100]), 50);
        assert_eq!(aggregated_progress(&[100, 0, 50]), 50);
        assert_eq!(aggregated_progress(&[]), 0);
        assert_eq!(aggregated_progress(&[100, 100]), 100);
    }

    #[test]
    fn test_aggregation_rounds_half_up() {
        assert_eq!(aggregated_progress(&[0, 1]), 1); // 0.5
        assert_eq!(aggregated_progress(&[10, 20, 20]), 17); // 16.67
        assert_eq!(aggregated_progress(&[0, 0, 1]), 0); // 0.33
    }

    #[test]
    fn test_aggregation_clamps_inputs() {
        assert_eq!(aggregated_progress(&[255, 100]), 100);
    }

    #[test]
    fn test_section_progress_recomputes() {
        let mut p = SectionProgress::new(SectionedWork::new(4, 3));
        assert_eq!(p.aggregated(), 0);

        p.set(1, 100).unwrap();
        assert_eq!(p.aggregated(), 33);
        p.set(2, 50).unwrap();
        assert_eq!(p.aggregated(), 50);
        p.set(2, 80).unwrap();
        assert_eq!(p.aggregated(), 60);
        assert_eq!(p.get(3), 0);
    }

    #[test]
    fn test_section_progress_rejects_bad_input() {
        let mut p = SectionProgress::new(SectionedWork::new(4, 2));
        assert_eq!(
            p.set(3, 10),
            Err(ProgressError::UnknownSection(WorkRef::section(4, 3)))
        );
        assert_eq!(p.set(1, 101), Err(ProgressError::InvalidPercentage(101)));
        assert!(p.set(0, 10).is_err());
    }

    #[test]
    fn test_single_section_work() {
        let p = SectionProgress::new(SectionedWork::new(4, 1))
            .with(1, 70)
            .unwrap();
        assert_eq!(p.aggregated(), 70);
    }

    proptest! {
        #[test]
        fn prop_aggregation_order_invariant(mut values in prop::collection::vec(0u8..=100, 1..12)) {
            let forward = aggregated_progress(&values);
            values.reverse();
            prop_assert_eq!(aggregated_progress(&values), forward);
            values.sort();
            prop_assert_eq!(aggregated_progress(&values), forward);
            prop_assert!(forward <= 100);
        }
    }
}
