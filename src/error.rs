//! Error types.
//!
//! Graph mutations fail hard and synchronously; evaluation never fails
//! (see [`EvaluationAnomaly`](crate::evaluator::EvaluationAnomaly) for the
//! soft signals it reports instead).

use thiserror::Error;

use crate::models::{EdgeId, WorkRef};

/// Dependency graph errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("{0} cannot depend on itself")]
    SelfReference(WorkRef),

    #[error("{work} depending on {depends_on} creates a circular dependency ({})", format_path(.path))]
    Cycle {
        work: WorkRef,
        depends_on: WorkRef,
        /// Existing chain `depends_on -> ... -> work` that the edge would close.
        path: Vec<WorkRef>,
    },

    #[error("{work} already depends on {depends_on} (edge {existing})")]
    DuplicateEdge {
        work: WorkRef,
        depends_on: WorkRef,
        existing: EdgeId,
    },

    #[error("Dependency edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("Dependency edge id {0} appears more than once")]
    DuplicateEdgeId(EdgeId),

    #[error("Dependency edge ids exhausted")]
    EdgeIdsExhausted,

    #[error("Dependency graph changed (expected revision {expected}, found {actual})")]
    StaleGraph { expected: u64, actual: u64 },

    #[error("{work} is outside sections 1..={sections_count}")]
    SectionOutOfRange { work: WorkRef, sections_count: u32 },

    #[error("Unknown dependency type: {0}")]
    UnknownDependencyType(String),

    #[error("Dependency graph lock poisoned")]
    Poisoned,
}

/// Progress submission errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("{0} already has a submitted progress entry awaiting approval")]
    AlreadySubmitted(WorkRef),

    #[error("{0} has no submitted progress entry")]
    NothingSubmitted(WorkRef),

    #[error("{0} has no draft progress entry")]
    NothingDrafted(WorkRef),

    #[error("Invalid progress percentage: {0} (expected 0..=100)")]
    InvalidPercentage(i32),

    #[error("{0} is not a section of its work")]
    UnknownSection(WorkRef),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, DependencyError>;

fn format_path(path: &[WorkRef]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
