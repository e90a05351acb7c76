//! Dependency graph store and cycle detection.
//!
//! The graph holds directed edges `(work, depends_on, type, lag)` for one
//! project and answers predecessor/successor queries. Acyclicity is enforced
//! at insert time and never repaired after the fact.
//!
//! # Algorithm
//!
//! Before committing `A depends_on B`, a DFS from `B` follows depends-on
//! edges. Reaching `A` means `B` already (transitively) depends on `A`, so
//! the new edge would close a cycle and is rejected.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22

pub mod cycle;
mod store;

pub use cycle::{find_cycle, path_between};
pub use store::{DependencyGraph, GraphSnapshot};
