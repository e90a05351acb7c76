//! Service boundary consumed by the API layer.
//!
//! Holds one [`DependencyGraph`] per project and joins it with dates
//! supplied by the work-management subsystem through [`DatesProvider`].
//!
//! # Concurrency
//!
//! Each project graph sits behind its own `RwLock`. Edge creation takes the
//! write lock for the cycle check *and* the write, so two concurrent
//! `create_dependency` calls on overlapping works are serialized and can
//! never both pass against the same snapshot. Queries and evaluations take
//! the read lock and run concurrently. Callers that validated against an
//! older [`revision`](DependencyService::revision) use
//! [`create_dependency_at`](DependencyService::create_dependency_at) to have
//! stale writes rejected.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::config::EngineConfig;
use crate::disabled::DisabledDates;
use crate::error::{DependencyError, Result};
use crate::evaluator::{ConstraintEvaluator, ConstraintInput, ConstraintResult};
use crate::graph::{DependencyGraph, GraphSnapshot};
use crate::models::{
    DependencyEdge, DependencyType, EdgeId, Endpoint, ProjectScope, ScheduleDates, WorkRef,
};
use crate::progress::ProgressLedger;
use crate::sections::SectionedWork;

/// Source of current dates (and section layout) for works.
///
/// Implemented by the work-management subsystem. Unknown units return
/// empty dates.
pub trait DatesProvider {
    /// Current plan/actual dates of a work or section.
    fn dates(&self, scope: ProjectScope, work: WorkRef) -> ScheduleDates;

    /// Number of sections a work is split into, if known.
    fn sections_count(&self, _scope: ProjectScope, _work_id: u64) -> Option<u32> {
        None
    }
}

/// In-memory [`DatesProvider`] for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDates {
    dates: HashMap<(ProjectScope, WorkRef), ScheduleDates>,
    sections: HashMap<(ProjectScope, u64), u32>,
}

impl InMemoryDates {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a unit's dates.
    pub fn set(&mut self, scope: ProjectScope, work: WorkRef, dates: ScheduleDates) {
        self.dates.insert((scope, work), dates);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, scope: ProjectScope, work: WorkRef, dates: ScheduleDates) -> Self {
        self.set(scope, work, dates);
        self
    }

    /// Declares a multi-section work.
    pub fn with_sections(mut self, scope: ProjectScope, work_id: u64, count: u32) -> Self {
        self.sections.insert((scope, work_id), count);
        self
    }
}

impl DatesProvider for InMemoryDates {
    fn dates(&self, scope: ProjectScope, work: WorkRef) -> ScheduleDates {
        self.dates.get(&(scope, work)).copied().unwrap_or_default()
    }

    fn sections_count(&self, scope: ProjectScope, work_id: u64) -> Option<u32> {
        self.sections.get(&(scope, work_id)).copied()
    }
}

type SharedGraph = Arc<RwLock<DependencyGraph>>;

/// Dependency engine entry point.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_dependency::models::{DependencyType, ProjectScope, ScheduleDates, WorkRef};
/// use u_dependency::service::{DependencyService, InMemoryDates};
///
/// let scope = ProjectScope::new(1);
/// let (a, b) = (WorkRef::work(1), WorkRef::work(2));
/// let finish = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
///
/// let dates = InMemoryDates::new().with(scope, a, ScheduleDates::new().with_actual_end(finish));
/// let service = DependencyService::new(dates);
///
/// service.create_dependency(scope, b, a, DependencyType::FinishToStart, 2).unwrap();
/// let result = service.minimum_actual_start(scope, b).unwrap();
/// assert_eq!(result.minimum_date, NaiveDate::from_ymd_opt(2024, 5, 22));
/// ```
pub struct DependencyService<D> {
    graphs: RwLock<HashMap<u64, SharedGraph>>,
    dates: D,
    evaluator: ConstraintEvaluator,
}

impl<D: DatesProvider> DependencyService<D> {
    /// Creates a service with default settings.
    pub fn new(dates: D) -> Self {
        Self::with_config(dates, &EngineConfig::default())
    }

    /// Creates a service from engine configuration.
    pub fn with_config(dates: D, config: &EngineConfig) -> Self {
        Self {
            graphs: RwLock::new(HashMap::new()),
            dates,
            evaluator: ConstraintEvaluator::from_config(config),
        }
    }

    /// The dates collaborator.
    pub fn dates(&self) -> &D {
        &self.dates
    }

    /// Replaces a project's graph with stored edges (audited for cycles).
    pub fn load_project(&self, scope: ProjectScope, snapshot: GraphSnapshot) -> Result<()> {
        let graph = DependencyGraph::from_snapshot(snapshot)?;
        let mut graphs = self.graphs.write().map_err(|_| DependencyError::Poisoned)?;
        graphs.insert(scope.project_id, Arc::new(RwLock::new(graph)));
        Ok(())
    }

    /// Captures a project's edges for persistence.
    pub fn snapshot(&self, scope: ProjectScope) -> Result<GraphSnapshot> {
        self.read(scope, |g| g.snapshot())
    }

    /// Current graph revision of a project.
    pub fn revision(&self, scope: ProjectScope) -> Result<u64> {
        self.read(scope, |g| g.revision())
    }

    /// Attaches `work depends_on depends_on`.
    ///
    /// Fails with `SelfReference`, `Cycle`, `DuplicateEdge`, or
    /// `SectionOutOfRange`; nothing is written on failure.
    pub fn create_dependency(
        &self,
        scope: ProjectScope,
        work: WorkRef,
        depends_on: WorkRef,
        dependency_type: DependencyType,
        lag_days: i32,
    ) -> Result<DependencyEdge> {
        self.check_sections(scope, work)?;
        self.check_sections(scope, depends_on)?;
        self.write(scope, |g| g.add_edge(work, depends_on, dependency_type, lag_days))
    }

    /// Like [`create_dependency`](Self::create_dependency), but only if the
    /// project graph is still at `expected_revision`.
    pub fn create_dependency_at(
        &self,
        scope: ProjectScope,
        expected_revision: u64,
        work: WorkRef,
        depends_on: WorkRef,
        dependency_type: DependencyType,
        lag_days: i32,
    ) -> Result<DependencyEdge> {
        self.check_sections(scope, work)?;
        self.check_sections(scope, depends_on)?;
        self.write(scope, |g| {
            g.add_edge_at(expected_revision, work, depends_on, dependency_type, lag_days)
        })
    }

    /// Changes an edge's type and/or lag.
    pub fn update_dependency(
        &self,
        scope: ProjectScope,
        id: EdgeId,
        dependency_type: Option<DependencyType>,
        lag_days: Option<i32>,
    ) -> Result<DependencyEdge> {
        self.write(scope, |g| g.update_edge(id, dependency_type, lag_days))
    }

    /// Detaches an edge.
    pub fn delete_dependency(&self, scope: ProjectScope, id: EdgeId) -> Result<()> {
        self.write(scope, |g| g.remove_edge(id).map(|_| ()))
    }

    /// Removes every edge touching a deleted work or section.
    pub fn delete_work(&self, scope: ProjectScope, work: WorkRef) -> Result<Vec<DependencyEdge>> {
        self.write(scope, |g| Ok(g.remove_work(work)))
    }

    /// All edges of a project, ordered by id.
    pub fn list_dependencies(&self, scope: ProjectScope) -> Result<Vec<DependencyEdge>> {
        self.read(scope, |g| g.edges())
    }

    /// Edges `work` depends on.
    pub fn predecessors_of(
        &self,
        scope: ProjectScope,
        work: WorkRef,
    ) -> Result<Vec<DependencyEdge>> {
        self.read(scope, |g| g.predecessors_of(work))
    }

    /// Edges that depend on `work`.
    pub fn successors_of(
        &self,
        scope: ProjectScope,
        work: WorkRef,
    ) -> Result<Vec<DependencyEdge>> {
        self.read(scope, |g| g.successors_of(work))
    }

    /// Predecessor edges joined with the predecessors' current dates.
    pub fn constraints_for(
        &self,
        scope: ProjectScope,
        work: WorkRef,
    ) -> Result<Vec<ConstraintInput>> {
        let edges = self.predecessors_of(scope, work)?;
        Ok(edges
            .iter()
            .map(|e| ConstraintInput::from_edge(e, self.dates.dates(scope, e.depends_on)))
            .collect())
    }

    /// Earliest date `work` may record as its actual start.
    pub fn minimum_actual_start(
        &self,
        scope: ProjectScope,
        work: WorkRef,
    ) -> Result<ConstraintResult> {
        self.evaluate(scope, work, Endpoint::Start)
    }

    /// Earliest date `work` may record as its actual finish.
    pub fn minimum_actual_finish(
        &self,
        scope: ProjectScope,
        work: WorkRef,
    ) -> Result<ConstraintResult> {
        self.evaluate(scope, work, Endpoint::Finish)
    }

    /// Start dates a date picker must refuse for `work`.
    pub fn disabled_start_dates(
        &self,
        scope: ProjectScope,
        work: WorkRef,
    ) -> Result<DisabledDates> {
        Ok(self.minimum_actual_start(scope, work)?.disabled_dates())
    }

    /// Finish dates a date picker must refuse for `work`.
    pub fn disabled_finish_dates(
        &self,
        scope: ProjectScope,
        work: WorkRef,
    ) -> Result<DisabledDates> {
        Ok(self.minimum_actual_finish(scope, work)?.disabled_dates())
    }

    /// Minimum start of every section of a work, evaluated independently.
    pub fn section_minimum_starts(
        &self,
        scope: ProjectScope,
        work: SectionedWork,
    ) -> Result<Vec<ConstraintResult>> {
        work.section_refs()
            .into_iter()
            .map(|unit| self.minimum_actual_start(scope, unit))
            .collect()
    }

    /// Work-level completion: unweighted mean of committed section values.
    pub fn aggregated_section_progress(
        &self,
        scope: ProjectScope,
        work_id: u64,
        ledger: &ProgressLedger,
    ) -> u8 {
        let count = self.dates.sections_count(scope, work_id).unwrap_or(1);
        ledger
            .section_progress(SectionedWork::new(work_id, count))
            .aggregated()
    }

    fn evaluate(
        &self,
        scope: ProjectScope,
        work: WorkRef,
        target: Endpoint,
    ) -> Result<ConstraintResult> {
        let inputs = self.constraints_for(scope, work)?;
        let own = self.dates.dates(scope, work);
        debug!(project = scope.project_id, %work, inputs = inputs.len(), "evaluating constraints");
        Ok(self.evaluator.evaluate(work, target, &own, &inputs))
    }

    fn check_sections(&self, scope: ProjectScope, work: WorkRef) -> Result<()> {
        if work.section.is_none() {
            return Ok(());
        }
        match self.dates.sections_count(scope, work.work_id) {
            Some(count) => SectionedWork::new(work.work_id, count).check_ref(work),
            None => Ok(()),
        }
    }

    fn read<T>(&self, scope: ProjectScope, f: impl FnOnce(&DependencyGraph) -> T) -> Result<T> {
        let shared = {
            let graphs = self.graphs.read().map_err(|_| DependencyError::Poisoned)?;
            graphs.get(&scope.project_id).cloned()
        };
        match shared {
            Some(shared) => {
                let graph = shared.read().map_err(|_| DependencyError::Poisoned)?;
                Ok(f(&*graph))
            }
            None => Ok(f(&DependencyGraph::new())),
        }
    }

    fn write<T>(
        &self,
        scope: ProjectScope,
        f: impl FnOnce(&mut DependencyGraph) -> Result<T>,
    ) -> Result<T> {
        let shared = {
            let mut graphs = self.graphs.write().map_err(|_| DependencyError::Poisoned)?;
            match graphs.get(&scope.project_id) {
                Some(shared) => Arc::clone(shared),
                None => {
                    // first write to a project: registered only once it changed something
                    let mut graph = DependencyGraph::new();
                    let value = f(&mut graph)?;
                    if graph.revision() > 0 {
                        graphs.insert(scope.project_id, Arc::new(RwLock::new(graph)));
                    }
                    return Ok(value);
                }
            }
        };
        let mut graph = shared.write().map_err(|_| DependencyError::Poisoned)?;
        f(&mut *graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Barrier;

    const FS: DependencyType = DependencyType::FinishToStart;
    const SS: DependencyType = DependencyType::StartToStart;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    fn scope() -> ProjectScope {
        ProjectScope::new(1)
    }

    fn w(id: u64) -> WorkRef {
        WorkRef::work(id)
    }

    #[test]
    fn test_scenario_fs_then_ss() {
        let dates = InMemoryDates::new().with(
            scope(),
            w(1),
            ScheduleDates::new()
                .with_actual_start(day(5))
                .with_actual_end(day(20)),
        );
        let service = DependencyService::new(dates);

        let edge = service.create_dependency(scope(), w(2), w(1), FS, 2).unwrap();
        let result = service.minimum_actual_start(scope(), w(2)).unwrap();
        assert_eq!(result.minimum_date, Some(day(22)));
        assert_eq!(result.binding.map(|b| b.edge_id), Some(edge.id));

        service
            .update_dependency(scope(), edge.id, Some(SS), Some(0))
            .unwrap();
        let result = service.minimum_actual_start(scope(), w(2)).unwrap();
        assert_eq!(result.minimum_date, Some(day(5)));
    }

    #[test]
    fn test_cycle_leaves_graph_unchanged() {
        let service = DependencyService::new(InMemoryDates::new());
        service.create_dependency(scope(), w(2), w(1), FS, 0).unwrap();
        service.create_dependency(scope(), w(3), w(2), FS, 0).unwrap();
        let before = service.list_dependencies(scope()).unwrap();

        let err = service.create_dependency(scope(), w(1), w(3), SS, 0).unwrap_err();
        assert!(matches!(err, DependencyError::Cycle { .. }));
        assert_eq!(service.list_dependencies(scope()).unwrap(), before);
    }

    #[test]
    fn test_self_reference_rejected() {
        let service = DependencyService::new(InMemoryDates::new());
        for t in DependencyType::ALL {
            assert_eq!(
                service.create_dependency(scope(), w(4), w(4), t, 0),
                Err(DependencyError::SelfReference(w(4)))
            );
        }
        assert!(service.list_dependencies(scope()).unwrap().is_empty());
    }

    #[test]
    fn test_projects_are_isolated() {
        let service = DependencyService::new(InMemoryDates::new());
        let other = ProjectScope::new(2);
        service.create_dependency(scope(), w(2), w(1), FS, 0).unwrap();

        // Same works, opposite direction, different project: no cycle.
        assert!(service.create_dependency(other, w(1), w(2), FS, 0).is_ok());
        assert_eq!(service.list_dependencies(other).unwrap().len(), 1);
        assert!(service.list_dependencies(ProjectScope::new(3)).unwrap().is_empty());
    }

    #[test]
    fn test_delete_and_queries() {
        let service = DependencyService::new(InMemoryDates::new());
        let e = service.create_dependency(scope(), w(2), w(1), FS, 0).unwrap();
        assert_eq!(service.successors_of(scope(), w(1)).unwrap(), vec![e.clone()]);
        assert_eq!(service.predecessors_of(scope(), w(2)).unwrap(), vec![e.clone()]);

        service.delete_dependency(scope(), e.id).unwrap();
        assert!(service.successors_of(scope(), w(1)).unwrap().is_empty());
        assert_eq!(
            service.delete_dependency(scope(), e.id),
            Err(DependencyError::EdgeNotFound(e.id))
        );
    }

    #[test]
    fn test_delete_work_cascades() {
        let service = DependencyService::new(InMemoryDates::new());
        service.create_dependency(scope(), w(2), w(1), FS, 0).unwrap();
        service.create_dependency(scope(), w(3), w(2), FS, 0).unwrap();

        let removed = service.delete_work(scope(), w(2)).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(service.list_dependencies(scope()).unwrap().is_empty());
    }

    #[test]
    fn test_constraints_for_joins_dates() {
        let a_dates = ScheduleDates::planned(day(1), day(4));
        let dates = InMemoryDates::new().with(scope(), w(1), a_dates);
        let service = DependencyService::new(dates);
        service.create_dependency(scope(), w(2), w(1), FS, 1).unwrap();
        service.create_dependency(scope(), w(2), w(3), SS, 0).unwrap();

        let inputs = service.constraints_for(scope(), w(2)).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].predecessor_dates, a_dates);
        assert_eq!(inputs[1].predecessor_dates, ScheduleDates::new());

        // W3 has no dates: only W1 constrains.
        let result = service.minimum_actual_start(scope(), w(2)).unwrap();
        assert_eq!(result.minimum_date, Some(day(5)));
        assert_eq!(result.anomalies.len(), 1);
    }

    #[test]
    fn test_disabled_dates() {
        let dates = InMemoryDates::new().with(
            scope(),
            w(1),
            ScheduleDates::new().with_actual_end(day(14)),
        );
        let service = DependencyService::new(dates);
        service.create_dependency(scope(), w(2), w(1), FS, 1).unwrap();

        let disabled = service.disabled_start_dates(scope(), w(2)).unwrap();
        assert!(disabled.is_disabled(day(14)));
        assert!(!disabled.is_disabled(day(15)));

        let free = service.disabled_start_dates(scope(), w(9)).unwrap();
        assert!(!free.disables_anything());
    }

    #[test]
    fn test_disabled_finish_dates() {
        let dates = InMemoryDates::new()
            .with(scope(), w(1), ScheduleDates::new().with_actual_end(day(10)))
            .with(scope(), w(2), ScheduleDates::planned(day(1), day(3)));
        let service = DependencyService::new(dates);
        service.create_dependency(scope(), w(2), w(1), FS, 0).unwrap();

        // Start no earlier than the 10th, planned two days long.
        let disabled = service.disabled_finish_dates(scope(), w(2)).unwrap();
        assert_eq!(disabled.first_enabled(), Some(day(12)));
    }

    #[test]
    fn test_multi_section_independence() {
        let dates = InMemoryDates::new()
            .with_sections(scope(), 7, 2)
            .with(scope(), w(1), ScheduleDates::new().with_actual_end(day(10)));
        let service = DependencyService::new(dates);
        service
            .create_dependency(scope(), WorkRef::section(7, 1), w(1), FS, 0)
            .unwrap();

        let results = service
            .section_minimum_starts(scope(), SectionedWork::new(7, 2))
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].minimum_date, Some(day(10)));
        assert_eq!(results[1].minimum_date, None);
        assert_eq!(
            service
                .minimum_actual_start(scope(), w(7))
                .unwrap()
                .minimum_date,
            None
        );
    }

    #[test]
    fn test_section_edge_couples_sections() {
        let dates = InMemoryDates::new()
            .with_sections(scope(), 7, 2)
            .with(
                scope(),
                WorkRef::section(7, 1),
                ScheduleDates::new()
                    .with_actual_start(day(4))
                    .with_actual_end(day(9)),
            );
        let service = DependencyService::new(dates);
        let edge = service
            .create_dependency(scope(), WorkRef::section(7, 2), WorkRef::section(7, 1), FS, 2)
            .unwrap();

        let second = service
            .minimum_actual_start(scope(), WorkRef::section(7, 2))
            .unwrap();
        assert_eq!(second.minimum_date, Some(day(11)));
        assert_eq!(second.binding.map(|b| b.edge_id), Some(edge.id));

        let first = service
            .minimum_actual_start(scope(), WorkRef::section(7, 1))
            .unwrap();
        assert!(!first.is_constrained());
        assert!(!service.minimum_actual_start(scope(), w(7)).unwrap().is_constrained());

        // Reverse edge between the same sections closes a loop.
        assert!(matches!(
            service.create_dependency(
                scope(),
                WorkRef::section(7, 1),
                WorkRef::section(7, 2),
                SS,
                0
            ),
            Err(DependencyError::Cycle { .. })
        ));
    }

    #[test]
    fn test_failed_write_registers_no_project() {
        let service = DependencyService::new(InMemoryDates::new());
        let other = ProjectScope::new(5);

        assert_eq!(
            service.delete_dependency(other, EdgeId(0)),
            Err(DependencyError::EdgeNotFound(EdgeId(0)))
        );
        assert!(service.update_dependency(other, EdgeId(0), Some(SS), None).is_err());
        assert!(service.delete_work(other, w(1)).unwrap().is_empty());
        assert!(service.graphs.read().unwrap().is_empty());

        service.create_dependency(other, w(2), w(1), FS, 0).unwrap();
        assert_eq!(service.graphs.read().unwrap().len(), 1);
        assert_eq!(service.revision(other).unwrap(), 1);
    }

    #[test]
    fn test_section_out_of_range() {
        let dates = InMemoryDates::new().with_sections(scope(), 7, 2);
        let service = DependencyService::new(dates);
        let err = service
            .create_dependency(scope(), WorkRef::section(7, 3), w(1), FS, 0)
            .unwrap_err();
        assert_eq!(
            err,
            DependencyError::SectionOutOfRange {
                work: WorkRef::section(7, 3),
                sections_count: 2
            }
        );
    }

    #[test]
    fn test_aggregated_section_progress() {
        let dates = InMemoryDates::new().with_sections(scope(), 7, 3);
        let service = DependencyService::new(dates);
        let ledger = ProgressLedger::new()
            .with_current(WorkRef::section(7, 2), 50)
            .and_then(|l| l.with_current(WorkRef::section(7, 3), 100))
            .unwrap();

        assert_eq!(service.aggregated_section_progress(scope(), 7, &ledger), 50);
    }

    #[test]
    fn test_stale_revision() {
        let service = DependencyService::new(InMemoryDates::new());
        let seen = service.revision(scope()).unwrap();
        service.create_dependency(scope(), w(2), w(1), FS, 0).unwrap();

        assert!(matches!(
            service.create_dependency_at(scope(), seen, w(3), w(2), FS, 0),
            Err(DependencyError::StaleGraph { .. })
        ));
        let now = service.revision(scope()).unwrap();
        assert!(service
            .create_dependency_at(scope(), now, w(3), w(2), FS, 0)
            .is_ok());
    }

    #[test]
    fn test_snapshot_and_load() {
        let service = DependencyService::new(InMemoryDates::new());
        service.create_dependency(scope(), w(2), w(1), FS, 3).unwrap();
        let snapshot = service.snapshot(scope()).unwrap();

        let restored = DependencyService::new(InMemoryDates::new());
        restored.load_project(scope(), snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(scope()).unwrap(), snapshot);
    }

    #[test]
    fn test_concurrent_opposite_edges_serialize() {
        let service = DependencyService::new(InMemoryDates::new());
        let barrier = Barrier::new(2);

        let results: Vec<Result<DependencyEdge>> = std::thread::scope(|s| {
            let first = s.spawn(|| {
                barrier.wait();
                service.create_dependency(scope(), w(1), w(2), FS, 0)
            });
            let second = s.spawn(|| {
                barrier.wait();
                service.create_dependency(scope(), w(2), w(1), FS, 0)
            });
            vec![first.join().unwrap(), second.join().unwrap()]
        });

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DependencyError::Cycle { .. }))));
        assert_eq!(service.list_dependencies(scope()).unwrap().len(), 1);
    }
}
