//! Constraint evaluator: minimum permissible start/finish dates.
//!
//! Given a work's predecessor edges (each joined with the predecessor's
//! current dates), computes the earliest date the dependent may record as
//! its actual start or actual finish.
//!
//! # Algorithm
//!
//! For each predecessor, read the relevant endpoint (actual, falling back to
//! plan), add the lag, and translate it to the requested side:
//!
//! | Type | Candidate | Start-side bound | Finish-side bound |
//! |------|-----------|------------------|-------------------|
//! | FS | pred finish + lag | candidate | candidate + duration |
//! | SS | pred start + lag | candidate | candidate + duration |
//! | FF | pred finish + lag | candidate − duration | candidate |
//! | SF | pred start + lag | candidate − duration | candidate |
//!
//! `duration` is the dependent's planned duration in calendar days. When it
//! is unknown (missing or inverted plan), cross-side edges contribute no
//! bound. The result is the latest contributing bound; `None` means
//! unconstrained.
//!
//! Evaluation never fails: broken predecessor data is reported as an
//! [`EvaluationAnomaly`] and skipped, so one bad row cannot block
//! scheduling of unrelated work.
//!
//! # Reference
//! PMI (2021), "PMBOK Guide", 7th ed., Precedence Diagramming Method

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::disabled::DisabledDates;
use crate::models::{
    add_days, DatePair, DependencyEdge, DependencyType, EdgeId, Endpoint, ScheduleDates, WorkRef,
};

/// One predecessor edge joined with the predecessor's current dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintInput {
    /// Edge that imposes the constraint.
    pub edge_id: EdgeId,
    /// Predecessor unit.
    pub predecessor: WorkRef,
    /// Relationship kind.
    pub dependency_type: DependencyType,
    /// Signed calendar-day lag.
    pub lag_days: i32,
    /// Predecessor's current dates.
    pub predecessor_dates: ScheduleDates,
}

impl ConstraintInput {
    /// Joins an edge with its predecessor's dates.
    pub fn from_edge(edge: &DependencyEdge, predecessor_dates: ScheduleDates) -> Self {
        Self {
            edge_id: edge.id,
            predecessor: edge.depends_on,
            dependency_type: edge.dependency_type,
            lag_days: edge.lag_days,
            predecessor_dates,
        }
    }
}

/// A bound imposed by one predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Edge that produced the bound.
    pub edge_id: EdgeId,
    /// Predecessor unit.
    pub predecessor: WorkRef,
    /// Relationship kind.
    pub dependency_type: DependencyType,
    /// Lag applied.
    pub lag_days: i32,
    /// Earliest permissible date on the evaluated side.
    pub bound: NaiveDate,
}

/// Soft data-quality signals raised during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationAnomaly {
    /// The predecessor has neither an actual nor a planned date for the
    /// endpoint the edge reads.
    MissingPredecessorData {
        edge_id: EdgeId,
        predecessor: WorkRef,
        endpoint: Endpoint,
    },
    /// The dependent's own start is after its end.
    InvalidDateOrder { work: WorkRef, pair: DatePair },
    /// A cross-side edge (FF/SF for starts, FS/SS for finishes) needs the
    /// dependent's planned duration, which is unknown.
    UnknownDuration { edge_id: EdgeId, work: WorkRef },
    /// Applying lag or duration left the representable date range.
    DateOutOfRange { edge_id: EdgeId },
}

/// Evaluator output for one dependent unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// Dependent unit.
    pub work: WorkRef,
    /// Which side was evaluated.
    pub target: Endpoint,
    /// Earliest permissible date (`None` = unconstrained).
    pub minimum_date: Option<NaiveDate>,
    /// The tightest (latest) contribution; first in input order on ties.
    pub binding: Option<Contribution>,
    /// Every bound that was produced, in input order.
    pub contributions: Vec<Contribution>,
    /// Skipped inputs and other data-quality signals.
    pub anomalies: Vec<EvaluationAnomaly>,
}

impl ConstraintResult {
    /// Whether any predecessor constrains the date.
    pub fn is_constrained(&self) -> bool {
        self.minimum_date.is_some()
    }

    /// Packages the minimum for a date-entry surface.
    pub fn disabled_dates(&self) -> DisabledDates {
        DisabledDates::new(self.minimum_date)
    }
}

/// Computes minimum permissible dates from predecessor constraints.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_dependency::evaluator::{ConstraintEvaluator, ConstraintInput};
/// use u_dependency::models::{DependencyType, EdgeId, ScheduleDates, WorkRef};
///
/// let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
/// let input = ConstraintInput {
///     edge_id: EdgeId(1),
///     predecessor: WorkRef::work(1),
///     dependency_type: DependencyType::FinishToStart,
///     lag_days: 2,
///     predecessor_dates: ScheduleDates::new().with_actual_end(day(20)),
/// };
///
/// let result = ConstraintEvaluator::new().minimum_actual_start(
///     WorkRef::work(2),
///     &ScheduleDates::new(),
///     &[input],
/// );
/// assert_eq!(result.minimum_date, Some(day(22)));
/// ```
#[derive(Debug, Clone)]
pub struct ConstraintEvaluator {
    log_anomalies: bool,
}

impl Default for ConstraintEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintEvaluator {
    /// Creates an evaluator that logs anomalies.
    pub fn new() -> Self {
        Self {
            log_anomalies: true,
        }
    }

    /// Creates an evaluator from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            log_anomalies: config.log_anomalies,
        }
    }

    /// Enables or disables anomaly logging.
    pub fn with_anomaly_logging(mut self, enabled: bool) -> Self {
        self.log_anomalies = enabled;
        self
    }

    /// Earliest date `work` may record as its actual start.
    pub fn minimum_actual_start(
        &self,
        work: WorkRef,
        own_dates: &ScheduleDates,
        inputs: &[ConstraintInput],
    ) -> ConstraintResult {
        self.evaluate(work, Endpoint::Start, own_dates, inputs)
    }

    /// Earliest date `work` may record as its actual finish.
    pub fn minimum_actual_finish(
        &self,
        work: WorkRef,
        own_dates: &ScheduleDates,
        inputs: &[ConstraintInput],
    ) -> ConstraintResult {
        self.evaluate(work, Endpoint::Finish, own_dates, inputs)
    }

    /// Evaluates the bound on one side of `work`.
    pub fn evaluate(
        &self,
        work: WorkRef,
        target: Endpoint,
        own_dates: &ScheduleDates,
        inputs: &[ConstraintInput],
    ) -> ConstraintResult {
        let mut anomalies: Vec<EvaluationAnomaly> = own_dates
            .inverted_pairs()
            .into_iter()
            .map(|pair| EvaluationAnomaly::InvalidDateOrder { work, pair })
            .collect();
        let duration = own_dates.planned_duration_days();

        let mut contributions = Vec::new();
        for input in inputs {
            match candidate_bound(input, target, duration) {
                Ok(bound) => contributions.push(Contribution {
                    edge_id: input.edge_id,
                    predecessor: input.predecessor,
                    dependency_type: input.dependency_type,
                    lag_days: input.lag_days,
                    bound,
                }),
                Err(skip) => anomalies.push(skip.into_anomaly(input, work)),
            }
        }

        let binding = tightest(&contributions).cloned();
        let minimum_date = binding.as_ref().map(|c| c.bound);

        if self.log_anomalies {
            for anomaly in &anomalies {
                debug!(%work, ?anomaly, "constraint input skipped");
            }
        }
        debug!(
            %work,
            ?target,
            minimum = ?minimum_date,
            contributing = contributions.len(),
            "constraints evaluated"
        );

        ConstraintResult {
            work,
            target,
            minimum_date,
            binding,
            contributions,
            anomalies,
        }
    }
}

/// Earliest date `work` may actually start, with default settings.
pub fn minimum_actual_start(
    work: WorkRef,
    own_dates: &ScheduleDates,
    inputs: &[ConstraintInput],
) -> Option<NaiveDate> {
    ConstraintEvaluator::new()
        .minimum_actual_start(work, own_dates, inputs)
        .minimum_date
}

/// Why an input produced no bound.
enum Skip {
    MissingData(Endpoint),
    UnknownDuration,
    OutOfRange,
}

impl Skip {
    fn into_anomaly(self, input: &ConstraintInput, work: WorkRef) -> EvaluationAnomaly {
        match self {
            Skip::MissingData(endpoint) => EvaluationAnomaly::MissingPredecessorData {
                edge_id: input.edge_id,
                predecessor: input.predecessor,
                endpoint,
            },
            Skip::UnknownDuration => EvaluationAnomaly::UnknownDuration {
                edge_id: input.edge_id,
                work,
            },
            Skip::OutOfRange => EvaluationAnomaly::DateOutOfRange {
                edge_id: input.edge_id,
            },
        }
    }
}

fn candidate_bound(
    input: &ConstraintInput,
    target: Endpoint,
    duration: Option<i64>,
) -> Result<NaiveDate, Skip> {
    let endpoint = input.dependency_type.predecessor_endpoint();
    let anchor = input
        .predecessor_dates
        .endpoint(endpoint)
        .ok_or(Skip::MissingData(endpoint))?;
    let candidate = add_days(anchor, i64::from(input.lag_days)).ok_or(Skip::OutOfRange)?;

    let bounded = input.dependency_type.bounded_endpoint();
    if bounded == target {
        return Ok(candidate);
    }

    let duration = duration.ok_or(Skip::UnknownDuration)?;
    let shift = match target {
        // finish-side bound pulled back to a start
        Endpoint::Start => -duration,
        // start-side bound pushed forward to a finish
        Endpoint::Finish => duration,
    };
    add_days(candidate, shift).ok_or(Skip::OutOfRange)
}

fn tightest(contributions: &[Contribution]) -> Option<&Contribution> {
    contributions.iter().fold(None, |best, c| match best {
        Some(b) if b.bound >= c.bound => Some(b),
        _ => Some(c),
    })
}
