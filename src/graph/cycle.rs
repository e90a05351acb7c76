//! Cycle detection over depends-on edges.
//!
//! Two checks share the same DFS:
//! - [`path_between`]: insert-time check. Adding `A depends_on B` closes a
//!   cycle iff `A` is already reachable from `B` by following depends-on
//!   edges (i.e. `B` transitively depends on `A`).
//! - [`find_cycle`]: whole-graph audit for edge sets loaded from storage.
//!
//! # Complexity
//! O(V + E) per call. Project graphs hold hundreds of works, so recursion
//! depth is not a concern.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.3-22.4

use std::collections::{BTreeMap, HashSet};

use crate::models::{DependencyEdge, WorkRef};

/// Finds a depends-on path from `from` to `target`.
///
/// `next(v)` yields the units `v` directly depends on. Returns the path
/// `from -> ... -> target` (both ends included), or `None` if `target`
/// is unreachable.
pub fn path_between<F, I>(from: WorkRef, target: WorkRef, next: F) -> Option<Vec<WorkRef>>
where
    F: Fn(WorkRef) -> I,
    I: IntoIterator<Item = WorkRef>,
{
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    if dfs_path(from, target, &next, &mut visited, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn dfs_path<F, I>(
    node: WorkRef,
    target: WorkRef,
    next: &F,
    visited: &mut HashSet<WorkRef>,
    path: &mut Vec<WorkRef>,
) -> bool
where
    F: Fn(WorkRef) -> I,
    I: IntoIterator<Item = WorkRef>,
{
    path.push(node);
    if node == target {
        return true;
    }
    visited.insert(node);

    for dep in next(node) {
        if !visited.contains(&dep) && dfs_path(dep, target, next, visited, path) {
            return true;
        }
    }

    path.pop();
    false
}

/// Searches a whole edge set for a directed cycle.
///
/// Returns the units on the first cycle found (in depends-on order, first
/// unit repeated at the end), or `None` if the set is acyclic. Traversal
/// order is deterministic.
pub fn find_cycle<'a>(edges: impl IntoIterator<Item = &'a DependencyEdge>) -> Option<Vec<WorkRef>> {
    let mut adj: BTreeMap<WorkRef, Vec<WorkRef>> = BTreeMap::new();
    for edge in edges {
        adj.entry(edge.work).or_default().push(edge.depends_on);
        adj.entry(edge.depends_on).or_default();
    }

    let mut visited = HashSet::new();
    let mut stack = Vec::new();

    for &node in adj.keys() {
        if visited.contains(&node) {
            continue;
        }
        if let Some(cycle) = cycle_dfs(node, &adj, &mut visited, &mut stack) {
            return Some(cycle);
        }
    }

    None
}

fn cycle_dfs(
    node: WorkRef,
    adj: &BTreeMap<WorkRef, Vec<WorkRef>>,
    visited: &mut HashSet<WorkRef>,
    stack: &mut Vec<WorkRef>,
) -> Option<Vec<WorkRef>> {
    visited.insert(node);
    stack.push(node);

    if let Some(deps) = adj.get(&node) {
        for &next in deps {
            if let Some(pos) = stack.iter().position(|&n| n == next) {
                // Back edge
                let mut cycle = stack[pos..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !visited.contains(&next) {
                if let Some(cycle) = cycle_dfs(next, adj, visited, stack) {
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    None
}
