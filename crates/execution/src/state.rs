//! Per-run scheduler bookkeeping.
//!
//! The scheduler owns a [`RunState`] exclusively and mutates it only between
//! action dispatches and on action completion, so none of this needs interior
//! mutability. Action bodies communicate back solely through their outcome.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use relay_core::{ActionRef, FailureMetadata, RunId};
use serde_json::Value;

use crate::error::ExecutionError;
use crate::outcome::{ActionOutcome, EdgeOutcome};
use crate::status::{ActionStatus, RunStatus};
use crate::transition::{validate_action_transition, validate_run_transition};

/// Scheduler bookkeeping for a single action.
#[derive(Debug, Clone)]
pub struct ActionState {
    /// Current status.
    pub status: ActionStatus,
    /// Indegree the scheduler waits on.
    pub indegree: usize,
    /// Parents not yet settled.
    pub remaining: usize,
    /// Outcome of each settled parent, in settlement order.
    pub parent_outcomes: Vec<(ActionRef, EdgeOutcome)>,
    /// The parent whose satisfaction made this action ready (any/first joins).
    pub triggered_by: Option<ActionRef>,
    /// Upstream failure carried in via a satisfied error edge.
    pub failure: Option<FailureMetadata>,
    /// When the action was enqueued for dispatch.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// When the action started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When the action reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
}

impl ActionState {
    /// A pending action waiting on `indegree` parents.
    #[must_use]
    pub fn new(indegree: usize) -> Self {
        Self {
            status: ActionStatus::Pending,
            indegree,
            remaining: indegree,
            parent_outcomes: Vec::new(),
            triggered_by: None,
            failure: None,
            scheduled_at: None,
            started_at: None,
            ended_at: None,
        }
    }

    /// Transition to a new status, validating the move and stamping times.
    pub fn transition_to(&mut self, new_status: ActionStatus) -> Result<(), ExecutionError> {
        validate_action_transition(self.status, new_status)?;
        self.status = new_status;
        if new_status == ActionStatus::Ready {
            self.scheduled_at = Some(Utc::now());
        }
        if new_status == ActionStatus::Running && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        if new_status.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Record a parent's settlement of this action's incoming edge.
    pub fn record_parent(
        &mut self,
        child: &ActionRef,
        parent: ActionRef,
        outcome: EdgeOutcome,
    ) -> Result<(), ExecutionError> {
        if self.parent_outcomes.iter().any(|(p, _)| p == &parent) {
            return Err(ExecutionError::DuplicateParentOutcome {
                child: child.clone(),
                parent,
            });
        }
        self.parent_outcomes.push((parent, outcome));
        self.remaining = self.remaining.saturating_sub(1);
        Ok(())
    }

    /// Number of settled parents.
    #[must_use]
    pub fn settled(&self) -> usize {
        self.parent_outcomes.len()
    }

    /// Count of parents that settled with the given outcome.
    #[must_use]
    pub fn count(&self, outcome: EdgeOutcome) -> usize {
        self.parent_outcomes
            .iter()
            .filter(|(_, o)| *o == outcome)
            .count()
    }

    /// The first parent that satisfied this action, in settlement order.
    #[must_use]
    pub fn first_satisfier(&self) -> Option<&ActionRef> {
        self.parent_outcomes
            .iter()
            .find(|(_, o)| *o == EdgeOutcome::Satisfied)
            .map(|(p, _)| p)
    }
}

/// The complete mutable state of one run.
#[derive(Debug)]
pub struct RunState {
    /// The run this state belongs to.
    pub run_id: RunId,
    /// Overall run status.
    status: RunStatus,
    actions: HashMap<ActionRef, ActionState>,
    results: HashMap<ActionRef, ActionOutcome>,
    /// Latched as soon as any action fails.
    pub any_failure: bool,
    /// When the run started executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunState {
    /// Create run state for the given refs and their indegrees.
    pub fn new(run_id: RunId, indegrees: impl IntoIterator<Item = (ActionRef, usize)>) -> Self {
        let actions = indegrees
            .into_iter()
            .map(|(r, n)| (r, ActionState::new(n)))
            .collect();
        Self {
            run_id,
            status: RunStatus::Created,
            actions,
            results: HashMap::new(),
            any_failure: false,
            started_at: None,
            completed_at: None,
        }
    }

    /// Current run status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Transition the run status, validating the move and stamping times.
    pub fn transition_status(&mut self, new_status: RunStatus) -> Result<(), ExecutionError> {
        validate_run_transition(self.status, new_status)?;
        self.status = new_status;
        if new_status == RunStatus::Running && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        if new_status.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// An action's state.
    #[must_use]
    pub fn action(&self, action_ref: &ActionRef) -> Option<&ActionState> {
        self.actions.get(action_ref)
    }

    /// An action's state, mutably.
    pub fn action_mut(&mut self, action_ref: &ActionRef) -> Result<&mut ActionState, ExecutionError> {
        self.actions
            .get_mut(action_ref)
            .ok_or_else(|| ExecutionError::UnknownAction(action_ref.clone()))
    }

    /// Record an action's terminal outcome.
    ///
    /// The results map is single-assign: a second write for the same ref is
    /// an engine bug and is rejected. The action's status transitions to the
    /// outcome's status and the failure latch is updated.
    pub fn record_result(
        &mut self,
        action_ref: &ActionRef,
        outcome: ActionOutcome,
    ) -> Result<(), ExecutionError> {
        if self.results.contains_key(action_ref) {
            return Err(ExecutionError::ResultAlreadyRecorded(action_ref.clone()));
        }
        let target_status = outcome.status;
        self.action_mut(action_ref)?.transition_to(target_status)?;
        if outcome.is_failed() {
            self.any_failure = true;
        }
        self.results.insert(action_ref.clone(), outcome);
        Ok(())
    }

    /// An action's recorded outcome, if terminal.
    #[must_use]
    pub fn result(&self, action_ref: &ActionRef) -> Option<&ActionOutcome> {
        self.results.get(action_ref)
    }

    /// All recorded outcomes.
    #[must_use]
    pub fn results(&self) -> &HashMap<ActionRef, ActionOutcome> {
        &self.results
    }

    /// Refs still pending, sorted for stable reporting.
    #[must_use]
    pub fn pending_refs(&self) -> Vec<ActionRef> {
        let mut refs: Vec<ActionRef> = self
            .actions
            .iter()
            .filter(|(_, s)| s.status == ActionStatus::Pending)
            .map(|(r, _)| r.clone())
            .collect();
        refs.sort();
        refs
    }

    /// Returns `true` when every action is in a terminal status.
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.actions.values().all(|s| s.status.is_terminal())
    }

    /// Completed outputs, keyed by ref.
    #[must_use]
    pub fn outputs(&self) -> HashMap<ActionRef, Value> {
        self.results
            .iter()
            .filter_map(|(r, o)| o.output.clone().map(|v| (r.clone(), v)))
            .collect()
    }
}
