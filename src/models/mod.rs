//! Dependency engine domain models.
//!
//! Provides the core data types shared by the graph store, the
//! constraint evaluator, and the section adapter.
//!
//! # Domain Mappings
//!
//! | u-dependency | Construction site | Spreadsheet plan |
//! |--------------|-------------------|------------------|
//! | WorkRef | Work item / section | Row |
//! | ScheduleDates | Plan & actual dates | Start/finish columns |
//! | DependencyEdge | Precedence link | Predecessor column |
//! | WorkCalendar | Site calendar | Holiday sheet |

pub mod calendar;
mod dates;
mod dependency;
mod work;

pub use calendar::{add_days, days_between, is_weekend, DateWindow, WorkCalendar};
pub use dates::{DatePair, Endpoint, ScheduleDates};
pub use dependency::{DependencyEdge, DependencyType, EdgeId};
pub use work::{ProjectScope, WorkRef};
