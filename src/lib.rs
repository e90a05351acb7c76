//! Schedule dependency engine for construction-project tracking.
//!
//! Lets one unit of work (a work item, or one section of a subdivided work)
//! declare a precedence relationship to another, keeps the relationship set
//! acyclic, and computes the earliest date a dependent unit may actually
//! start or finish given its predecessors' planned and actual dates.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `WorkRef`, `ScheduleDates`, `DependencyEdge`,
//!   `DependencyType`, `WorkCalendar` and date arithmetic helpers
//! - **`graph`**: Dependency graph store with insert-time cycle rejection
//! - **`evaluator`**: Minimum permissible start/finish dates (FS/SS/FF/SF + lag)
//! - **`disabled`**: Disabled-date predicates for date-entry surfaces
//! - **`sections`**: Multi-section works and progress aggregation
//! - **`progress`**: Draft → submitted → approved/rejected progress workflow
//! - **`service`**: Per-project API surface with explicit `ProjectScope`
//! - **`config`**: TOML-backed engine settings
//!
//! # Architecture
//!
//! Pure computation: no I/O beyond optional config loading, no background
//! work. Graph mutation is the only stateful operation and is serialized per
//! project; evaluation is a pure function of its inputs. Calendars, dates,
//! and roles are owned by collaborators and passed in.
//!
//! # References
//!
//! - PMI (2021), "PMBOK Guide", 7th ed., Precedence Diagramming Method
//! - Cormen et al. (2009), "Introduction to Algorithms", Ch. 22

pub mod config;
pub mod disabled;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod models;
pub mod progress;
pub mod sections;
pub mod service;

pub use config::EngineConfig;
pub use disabled::{disabled_dates, DisabledDates};
pub use error::{ConfigError, DependencyError, ProgressError};
pub use evaluator::{ConstraintEvaluator, ConstraintInput, ConstraintResult, EvaluationAnomaly};
pub use graph::DependencyGraph;
pub use progress::{ProgressLedger, ProgressStatus};
pub use sections::{aggregated_progress, SectionProgress, SectionedWork};
pub use service::{DatesProvider, DependencyService, InMemoryDates};
