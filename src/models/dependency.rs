//! Dependency edges between schedulable units.
//!
//! An edge `work depends_on predecessor` carries one of the four canonical
//! precedence kinds and a signed calendar-day lag (negative = lead).
//!
//! | Type | Looks at predecessor's | Bounds dependent's |
//! |------|------------------------|--------------------|
//! | FS   | finish                 | start              |
//! | SS   | start                  | start              |
//! | FF   | finish                 | finish             |
//! | SF   | start                  | finish             |
//!
//! # Reference
//! PMI (2021), "PMBOK Guide", 7th ed., Precedence Diagramming Method

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Endpoint, WorkRef};
use crate::error::DependencyError;

/// Precedence relationship kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyType {
    /// Finish-to-start.
    #[default]
    #[serde(rename = "FS")]
    FinishToStart,
    /// Start-to-start.
    #[serde(rename = "SS")]
    StartToStart,
    /// Finish-to-finish.
    #[serde(rename = "FF")]
    FinishToFinish,
    /// Start-to-finish.
    #[serde(rename = "SF")]
    StartToFinish,
}

impl DependencyType {
    /// All four kinds, in canonical order.
    pub const ALL: [DependencyType; 4] = [
        Self::FinishToStart,
        Self::StartToStart,
        Self::FinishToFinish,
        Self::StartToFinish,
    ];

    /// Two-letter code (`FS`, `SS`, `FF`, `SF`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        }
    }

    /// The predecessor date this kind reads.
    pub fn predecessor_endpoint(&self) -> Endpoint {
        match self {
            Self::FinishToStart | Self::FinishToFinish => Endpoint::Finish,
            Self::StartToStart | Self::StartToFinish => Endpoint::Start,
        }
    }

    /// The dependent date this kind bounds.
    pub fn bounded_endpoint(&self) -> Endpoint {
        match self {
            Self::FinishToStart | Self::StartToStart => Endpoint::Start,
            Self::FinishToFinish | Self::StartToFinish => Endpoint::Finish,
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DependencyType {
    type Err = DependencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FS" => Ok(Self::FinishToStart),
            "SS" => Ok(Self::StartToStart),
            "FF" => Ok(Self::FinishToFinish),
            "SF" => Ok(Self::StartToFinish),
            _ => Err(DependencyError::UnknownDependencyType(s.to_string())),
        }
    }
}

/// Dependency edge identifier, allocated by the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A committed precedence edge: `work` depends on `depends_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Edge identifier.
    pub id: EdgeId,
    /// Dependent unit.
    pub work: WorkRef,
    /// Predecessor unit.
    pub depends_on: WorkRef,
    /// Relationship kind.
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
    /// Signed calendar-day offset (negative = lead).
    pub lag_days: i32,
}

impl DependencyEdge {
    /// Whether this edge touches the given unit at either end.
    pub fn involves(&self, work: WorkRef) -> bool {
        self.work == work || self.depends_on == work
    }
}
