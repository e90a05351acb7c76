//! Work and section identity.
//!
//! A work item is the schedulable unit of a construction project. When a
//! work is subdivided, each section (1..=N) is addressed separately and may
//! carry its own dates and dependency edges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Explicit project identity passed into every engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectScope {
    /// Project identifier.
    pub project_id: u64,
}

impl ProjectScope {
    /// Creates a scope for the given project.
    pub fn new(project_id: u64) -> Self {
        Self { project_id }
    }
}

/// Identity of a schedulable unit: a whole work or one of its sections.
///
/// Two refs are equal iff both the work id and the section number match,
/// so `W7` and `W7#1` are distinct vertices in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkRef {
    /// Work identifier.
    pub work_id: u64,
    /// Section number (`None` = whole work).
    pub section: Option<u32>,
}

impl WorkRef {
    /// Refers to a whole work.
    pub fn work(work_id: u64) -> Self {
        Self {
            work_id,
            section: None,
        }
    }

    /// Refers to one section of a multi-section work.
    pub fn section(work_id: u64, section: u32) -> Self {
        Self {
            work_id,
            section: Some(section),
        }
    }

    /// Whether this ref addresses a section rather than the whole work.
    #[inline]
    pub fn is_section(&self) -> bool {
        self.section.is_some()
    }

    /// The whole-work ref this section belongs to.
    pub fn parent(&self) -> Self {
        Self::work(self.work_id)
    }
}

impl fmt::Display for WorkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.section {
            Some(section) => write!(f, "W{}#{}", self.work_id, section),
            None => write!(f, "W{}", self.work_id),
        }
    }
}
