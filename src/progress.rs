//! Progress submission workflow.
//!
//! A completion-percentage change moves through:
//!
//! ```text
//! Draft ──submit──► Submitted ──approve──► Approved   (value committed)
//!                        └─────reject────► Rejected   (value discarded)
//! ```
//!
//! At most one entry per unit is outstanding. Submitting while an entry is
//! already `Submitted` is a conflict and is rejected. Role checks for
//! approve/reject belong to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::error::ProgressError;
use crate::models::WorkRef;
use crate::sections::{SectionProgress, SectionedWork};

/// Workflow state of a progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Edited locally, not yet sent.
    Draft,
    /// Awaiting approval.
    Submitted,
    /// Accepted; the value is now current.
    Approved,
    /// Refused; the prior value stays current.
    Rejected,
}

impl ProgressStatus {
    /// Whether the entry still awaits a decision or a submit.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Draft | Self::Submitted)
    }
}

/// The latest progress entry of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Proposed percentage.
    pub percent: u8,
    /// Workflow state.
    pub status: ProgressStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ProgressRecord {
    current: u8,
    entry: Option<ProgressEntry>,
}

/// Committed progress values and their outstanding entries.
#[derive(Debug, Clone, Default)]
pub struct ProgressLedger {
    records: HashMap<WorkRef, ProgressRecord>,
}

impl ProgressLedger {
    /// Creates an empty ledger (everything at 0%).
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a committed value, e.g. when loading from storage.
    pub fn with_current(mut self, work: WorkRef, percent: u8) -> Result<Self, ProgressError> {
        let percent = check_percent(i32::from(percent))?;
        self.records.entry(work).or_default().current = percent;
        Ok(self)
    }

    /// Committed percentage (0 if never approved).
    pub fn current(&self, work: WorkRef) -> u8 {
        self.records.get(&work).map(|r| r.current).unwrap_or(0)
    }

    /// Latest entry, open or decided.
    pub fn entry(&self, work: WorkRef) -> Option<ProgressEntry> {
        self.records.get(&work).and_then(|r| r.entry)
    }

    /// Workflow state of the latest entry.
    pub fn status(&self, work: WorkRef) -> Option<ProgressStatus> {
        self.entry(work).map(|e| e.status)
    }

    /// Value awaiting approval, if any.
    pub fn pending(&self, work: WorkRef) -> Option<u8> {
        self.entry(work)
            .filter(|e| e.status == ProgressStatus::Submitted)
            .map(|e| e.percent)
    }

    /// Units with an entry awaiting approval.
    pub fn submitted(&self) -> Vec<WorkRef> {
        let mut refs: Vec<WorkRef> = self
            .records
            .iter()
            .filter(|(_, r)| matches!(r.entry, Some(e) if e.status == ProgressStatus::Submitted))
            .map(|(w, _)| *w)
            .collect();
        refs.sort();
        refs
    }

    /// Creates or replaces the local draft.
    pub fn edit_draft(&mut self, work: WorkRef, percent: i32) -> Result<(), ProgressError> {
        let percent = check_percent(percent)?;
        let record = self.records.entry(work).or_default();
        if matches!(record.entry, Some(e) if e.status == ProgressStatus::Submitted) {
            return Err(ProgressError::AlreadySubmitted(work));
        }
        record.entry = Some(ProgressEntry {
            percent,
            status: ProgressStatus::Draft,
        });
        Ok(())
    }

    /// Sends the draft for approval. Returns the submitted value.
    pub fn submit(&mut self, work: WorkRef) -> Result<u8, ProgressError> {
        let record = self
            .records
            .get_mut(&work)
            .ok_or(ProgressError::NothingDrafted(work))?;
        let entry = record.entry.as_mut().ok_or(ProgressError::NothingDrafted(work))?;
        match entry.status {
            ProgressStatus::Submitted => Err(ProgressError::AlreadySubmitted(work)),
            ProgressStatus::Draft => {
                entry.status = ProgressStatus::Submitted;
                info!(%work, percent = entry.percent, "progress submitted");
                Ok(entry.percent)
            }
            ProgressStatus::Approved | ProgressStatus::Rejected => {
                Err(ProgressError::NothingDrafted(work))
            }
        }
    }

    /// Commits the submitted value. Returns the new current value.
    pub fn approve(&mut self, work: WorkRef) -> Result<u8, ProgressError> {
        let record = self.submitted_record(work)?;
        if let Some(entry) = record.entry.as_mut() {
            entry.status = ProgressStatus::Approved;
            record.current = entry.percent;
        }
        info!(%work, percent = record.current, "progress approved");
        Ok(record.current)
    }

    /// Discards the submitted value. Returns the unchanged current value.
    pub fn reject(&mut self, work: WorkRef) -> Result<u8, ProgressError> {
        let record = self.submitted_record(work)?;
        if let Some(entry) = record.entry.as_mut() {
            entry.status = ProgressStatus::Rejected;
        }
        info!(%work, kept = record.current, "progress rejected");
        Ok(record.current)
    }

    /// Committed section values of a work, ready for aggregation.
    pub fn section_progress(&self, work: SectionedWork) -> SectionProgress {
        let mut table = SectionProgress::new(work);
        for (section, unit) in (1..).zip(work.section_refs()) {
            table.record(section, self.current(unit));
        }
        table
    }

    fn submitted_record(&mut self, work: WorkRef) -> Result<&mut ProgressRecord, ProgressError> {
        match self.records.get_mut(&work) {
            Some(record)
                if matches!(record.entry, Some(e) if e.status == ProgressStatus::Submitted) =>
            {
                Ok(record)
            }
            _ => Err(ProgressError::NothingSubmitted(work)),
        }
    }
}

fn check_percent(percent: i32) -> Result<u8, ProgressError> {
    u8::try_from(percent)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or(ProgressError::InvalidPercentage(percent))
}
