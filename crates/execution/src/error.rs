//! Execution state errors.

use relay_core::ActionRef;
use thiserror::Error;

/// Errors raised by run-state bookkeeping.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    /// A status transition is not valid for the current status.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Attempted target status.
        to: String,
    },

    /// A referenced action does not exist in the run state.
    #[error("unknown action: {0}")]
    UnknownAction(ActionRef),

    /// An action's result was written a second time.
    #[error("result already recorded for '{0}'")]
    ResultAlreadyRecorded(ActionRef),

    /// A parent settled the same child twice.
    #[error("parent '{parent}' already settled child '{child}'")]
    DuplicateParentOutcome {
        /// The child whose edge was settled twice.
        child: ActionRef,
        /// The parent that settled it.
        parent: ActionRef,
    },

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(
            ExecutionError::InvalidTransition {
                from: "pending".into(),
                to: "completed".into()
            }
            .to_string(),
            "invalid transition from pending to completed"
        );
        assert_eq!(
            ExecutionError::ResultAlreadyRecorded(ActionRef::new("a")).to_string(),
            "result already recorded for 'a'"
        );
    }
}
