//! Status transition validation for runs and actions.

use crate::error::ExecutionError;
use crate::status::{ActionStatus, RunStatus};

/// Returns `true` if the action-level transition from `from` to `to` is valid.
///
/// `Ready → Failed` covers queued actions drained after a run-level
/// cancellation or timeout without ever being launched.
#[must_use]
pub fn can_transition_action(from: ActionStatus, to: ActionStatus) -> bool {
    matches!(
        (from, to),
        (ActionStatus::Pending, ActionStatus::Ready)
            | (ActionStatus::Pending, ActionStatus::Skipped)
            | (ActionStatus::Ready, ActionStatus::Running)
            | (ActionStatus::Ready, ActionStatus::Failed)
            | (ActionStatus::Running, ActionStatus::Completed)
            | (ActionStatus::Running, ActionStatus::Failed)
    )
}

/// Validate an action-level transition, returning an error if invalid.
pub fn validate_action_transition(
    from: ActionStatus,
    to: ActionStatus,
) -> Result<(), ExecutionError> {
    if can_transition_action(from, to) {
        Ok(())
    } else {
        Err(ExecutionError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Returns `true` if the run-level transition from `from` to `to` is valid.
#[must_use]
pub fn can_transition_run(from: RunStatus, to: RunStatus) -> bool {
    matches!(
        (from, to),
        (RunStatus::Created, RunStatus::Running)
            | (RunStatus::Running, RunStatus::Completed)
            | (RunStatus::Running, RunStatus::Failed)
            | (RunStatus::Running, RunStatus::TimedOut)
            | (RunStatus::Running, RunStatus::Cancelled)
    )
}

/// Validate a run-level transition, returning an error if invalid.
pub fn validate_run_transition(from: RunStatus, to: RunStatus) -> Result<(), ExecutionError> {
    if can_transition_run(from, to) {
        Ok(())
    } else {
        Err(ExecutionError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_action_transitions() {
        assert!(can_transition_action(
            ActionStatus::Pending,
            ActionStatus::Ready
        ));
        assert!(can_transition_action(
            ActionStatus::Pending,
            ActionStatus::Skipped
        ));
        assert!(can_transition_action(
            ActionStatus::Ready,
            ActionStatus::Running
        ));
        assert!(can_transition_action(
            ActionStatus::Ready,
            ActionStatus::Failed
        ));
        assert!(can_transition_action(
            ActionStatus::Running,
            ActionStatus::Completed
        ));
        assert!(can_transition_action(
            ActionStatus::Running,
            ActionStatus::Failed
        ));
    }

    #[test]
    fn invalid_action_transitions() {
        assert!(!can_transition_action(
            ActionStatus::Pending,
            ActionStatus::Running
        ));
        assert!(!can_transition_action(
            ActionStatus::Pending,
            ActionStatus::Completed
        ));
        assert!(!can_transition_action(
            ActionStatus::Ready,
            ActionStatus::Skipped
        ));
        assert!(!can_transition_action(
            ActionStatus::Running,
            ActionStatus::Skipped
        ));
        assert!(!can_transition_action(
            ActionStatus::Completed,
            ActionStatus::Running
        ));
        assert!(!can_transition_action(
            ActionStatus::Skipped,
            ActionStatus::Running
        ));
    }

    #[test]
    fn valid_run_transitions() {
        assert!(can_transition_run(RunStatus::Created, RunStatus::Running));
        assert!(can_transition_run(RunStatus::Running, RunStatus::Completed));
        assert!(can_transition_run(RunStatus::Running, RunStatus::Failed));
        assert!(can_transition_run(RunStatus::Running, RunStatus::TimedOut));
        assert!(can_transition_run(RunStatus::Running, RunStatus::Cancelled));
    }

    #[test]
    fn invalid_run_transitions() {
        assert!(!can_transition_run(RunStatus::Created, RunStatus::Completed));
        assert!(!can_transition_run(RunStatus::Completed, RunStatus::Running));
        assert!(!can_transition_run(RunStatus::Failed, RunStatus::Running));
    }

    #[test]
    fn validate_reports_both_statuses() {
        let err = validate_action_transition(ActionStatus::Completed, ActionStatus::Running)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid transition from completed to running");
    }
}
