//! In-memory dependency graph store.
//!
//! Edges live in an arena keyed by [`EdgeId`]; vertices are plain
//! [`WorkRef`] keys, so there are no object references to form cycles.
//! Two indexes answer predecessor and successor queries without scanning.
//!
//! Every mutation validates first and writes second: a rejected call leaves
//! the graph (and its revision) untouched.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::cycle::{find_cycle, path_between};
use crate::error::{DependencyError, Result};
use crate::models::{DependencyEdge, DependencyType, EdgeId, WorkRef};

/// Snapshot of a project's dependency edges, suitable for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Graph revision at the time of the snapshot.
    pub revision: u64,
    /// All edges, ordered by id.
    pub edges: Vec<DependencyEdge>,
}

/// Directed dependency graph for one project.
///
/// # Example
///
/// ```
/// use u_dependency::graph::DependencyGraph;
/// use u_dependency::models::{DependencyType, WorkRef};
///
/// let mut graph = DependencyGraph::new();
/// let a = WorkRef::work(1);
/// let b = WorkRef::work(2);
///
/// graph.add_edge(b, a, DependencyType::FinishToStart, 2).unwrap();
/// assert!(graph.add_edge(a, b, DependencyType::FinishToStart, 0).is_err());
/// assert_eq!(graph.predecessors_of(b).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<EdgeId, DependencyEdge>,
    /// dependent → edges where it is `work`
    predecessors: HashMap<WorkRef, Vec<EdgeId>>,
    /// predecessor → edges where it is `depends_on`
    successors: HashMap<WorkRef, Vec<EdgeId>>,
    next_id: u64,
    revision: u64,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a graph from stored edges, keeping their ids.
    ///
    /// The whole set is audited: self-references, duplicate pairs, duplicate
    /// ids, and cycles are all rejected.
    pub fn from_edges(edges: impl IntoIterator<Item = DependencyEdge>) -> Result<Self> {
        let mut graph = Self::new();
        for edge in edges {
            if edge.work == edge.depends_on {
                return Err(DependencyError::SelfReference(edge.work));
            }
            if let Some(existing) = graph.find_edge(edge.work, edge.depends_on) {
                return Err(DependencyError::DuplicateEdge {
                    work: edge.work,
                    depends_on: edge.depends_on,
                    existing: existing.id,
                });
            }
            if graph.edges.contains_key(&edge.id) {
                return Err(DependencyError::DuplicateEdgeId(edge.id));
            }
            let after = edge
                .id
                .0
                .checked_add(1)
                .ok_or(DependencyError::EdgeIdsExhausted)?;
            graph.next_id = graph.next_id.max(after);
            graph.insert(edge);
        }

        if let Some(path) = find_cycle(graph.edges.values()) {
            let work = path[0];
            let depends_on = path.get(1).copied().unwrap_or(work);
            return Err(DependencyError::Cycle {
                work,
                depends_on,
                path,
            });
        }

        Ok(graph)
    }

    /// Restores a graph from a snapshot, keeping its revision.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut graph = Self::from_edges(snapshot.edges)?;
        graph.revision = snapshot.revision;
        Ok(graph)
    }

    /// Captures the current edge set.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            revision: self.revision,
            edges: self.edges(),
        }
    }

    /// Mutation counter; bumped by every successful add, update, or remove.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Looks up an edge by id.
    pub fn get(&self, id: EdgeId) -> Option<&DependencyEdge> {
        self.edges.get(&id)
    }

    /// All edges, ordered by id.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.edges.values().cloned().collect()
    }

    /// Every unit that appears at either end of an edge.
    pub fn works(&self) -> BTreeSet<WorkRef> {
        self.predecessors
            .keys()
            .chain(self.successors.keys())
            .copied()
            .collect()
    }

    /// Edges on which `work` depends, in insertion order.
    pub fn predecessors_of(&self, work: WorkRef) -> Vec<DependencyEdge> {
        self.collect(self.predecessors.get(&work))
    }

    /// Edges that depend on `work`, in insertion order.
    pub fn successors_of(&self, work: WorkRef) -> Vec<DependencyEdge> {
        self.collect(self.successors.get(&work))
    }

    /// Finds the edge `work depends_on depends_on`, if any.
    pub fn find_edge(&self, work: WorkRef, depends_on: WorkRef) -> Option<&DependencyEdge> {
        self.predecessors
            .get(&work)?
            .iter()
            .filter_map(|id| self.edges.get(id))
            .find(|e| e.depends_on == depends_on)
    }

    /// All units `work` transitively depends on.
    pub fn ancestors_of(&self, work: WorkRef) -> BTreeSet<WorkRef> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![work];
        while let Some(current) = stack.pop() {
            for dep in self.direct_dependencies(current) {
                if seen.insert(dep) {
                    stack.push(dep);
                }
            }
        }
        seen
    }

    /// Returns the chain `depends_on -> ... -> work` that adding
    /// `work depends_on depends_on` would close, or `None` if it is safe.
    pub fn cycle_path(&self, work: WorkRef, depends_on: WorkRef) -> Option<Vec<WorkRef>> {
        path_between(depends_on, work, |v| self.direct_dependencies(v))
    }

    /// Validates a prospective edge without writing it.
    pub fn check_edge(&self, work: WorkRef, depends_on: WorkRef) -> Result<()> {
        if work == depends_on {
            return Err(DependencyError::SelfReference(work));
        }
        if let Some(existing) = self.find_edge(work, depends_on) {
            return Err(DependencyError::DuplicateEdge {
                work,
                depends_on,
                existing: existing.id,
            });
        }
        if let Some(path) = self.cycle_path(work, depends_on) {
            return Err(DependencyError::Cycle {
                work,
                depends_on,
                path,
            });
        }
        Ok(())
    }

    /// Adds `work depends_on depends_on` after checking it keeps the graph
    /// acyclic. Nothing is written on failure.
    pub fn add_edge(
        &mut self,
        work: WorkRef,
        depends_on: WorkRef,
        dependency_type: DependencyType,
        lag_days: i32,
    ) -> Result<DependencyEdge> {
        if let Err(err) = self.check_edge(work, depends_on) {
            warn!(%work, %depends_on, "dependency rejected: {err}");
            return Err(err);
        }

        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or(DependencyError::EdgeIdsExhausted)?;
        let edge = DependencyEdge {
            id: EdgeId(self.next_id),
            work,
            depends_on,
            dependency_type,
            lag_days,
        };
        self.next_id = next_id;
        self.revision += 1;
        self.insert(edge.clone());

        info!(
            edge = %edge.id,
            %work,
            %depends_on,
            kind = %dependency_type,
            lag_days,
            "dependency created"
        );
        Ok(edge)
    }

    /// Adds an edge only if the graph is still at `expected_revision`.
    ///
    /// Lets a caller that checked against an earlier snapshot detect that
    /// the graph moved underneath it.
    pub fn add_edge_at(
        &mut self,
        expected_revision: u64,
        work: WorkRef,
        depends_on: WorkRef,
        dependency_type: DependencyType,
        lag_days: i32,
    ) -> Result<DependencyEdge> {
        if self.revision != expected_revision {
            warn!(
                expected = expected_revision,
                actual = self.revision,
                "stale dependency write rejected"
            );
            return Err(DependencyError::StaleGraph {
                expected: expected_revision,
                actual: self.revision,
            });
        }
        self.add_edge(work, depends_on, dependency_type, lag_days)
    }

    /// Changes an edge's type and/or lag. Endpoints never change, so this
    /// cannot introduce a cycle.
    pub fn update_edge(
        &mut self,
        id: EdgeId,
        dependency_type: Option<DependencyType>,
        lag_days: Option<i32>,
    ) -> Result<DependencyEdge> {
        let edge = self
            .edges
            .get_mut(&id)
            .ok_or(DependencyError::EdgeNotFound(id))?;

        if let Some(t) = dependency_type {
            edge.dependency_type = t;
        }
        if let Some(lag) = lag_days {
            edge.lag_days = lag;
        }
        let updated = edge.clone();
        self.revision += 1;

        info!(
            edge = %id,
            kind = %updated.dependency_type,
            lag_days = updated.lag_days,
            "dependency updated"
        );
        Ok(updated)
    }

    /// Deletes an edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<DependencyEdge> {
        let edge = self
            .edges
            .remove(&id)
            .ok_or(DependencyError::EdgeNotFound(id))?;

        detach(&mut self.predecessors, edge.work, id);
        detach(&mut self.successors, edge.depends_on, id);
        self.revision += 1;

        info!(edge = %id, work = %edge.work, depends_on = %edge.depends_on, "dependency deleted");
        Ok(edge)
    }

    /// Deletes every edge touching `work` (the unit itself was deleted).
    pub fn remove_work(&mut self, work: WorkRef) -> Vec<DependencyEdge> {
        let ids: BTreeSet<EdgeId> = self
            .predecessors
            .get(&work)
            .into_iter()
            .chain(self.successors.get(&work))
            .flatten()
            .copied()
            .collect();

        ids.into_iter()
            .filter_map(|id| self.remove_edge(id).ok())
            .collect()
    }

    fn direct_dependencies(&self, work: WorkRef) -> Vec<WorkRef> {
        self.predecessors
            .get(&work)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.edges.get(id))
                    .map(|e| e.depends_on)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn collect(&self, ids: Option<&Vec<EdgeId>>) -> Vec<DependencyEdge> {
        ids.map(|ids| {
            ids.iter()
                .filter_map(|id| self.edges.get(id))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }

    fn insert(&mut self, edge: DependencyEdge) {
        self.predecessors.entry(edge.work).or_default().push(edge.id);
        self.successors
            .entry(edge.depends_on)
            .or_default()
            .push(edge.id);
        self.edges.insert(edge.id, edge);
    }
}

fn detach(index: &mut HashMap<WorkRef, Vec<EdgeId>>, key: WorkRef, id: EdgeId) {
    if let Some(ids) = index.get_mut(&key) {
        ids.retain(|&e| e != id);
        if ids.is_empty() {
            index.remove(&key);
        }
    }
}
