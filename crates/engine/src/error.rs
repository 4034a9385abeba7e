//! Engine-level errors.
//!
//! Component failures are not engine errors — they become failed action
//! outcomes and route along error edges. An [`EngineError`] means the run
//! itself could not be driven: an invalid definition, a scheduler invariant
//! violation, or a broken task.

use relay_core::ActionRef;
use relay_execution::ExecutionError;
use relay_workflow::WorkflowError;
use thiserror::Error;

/// Errors fatal to a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The definition failed structural validation.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(#[from] WorkflowError),

    /// The scheduler found no runnable action while refs are still pending —
    /// a malformed indegree or a bug in the DAG.
    #[error("deadlock: no runnable actions while still pending: {}", refs_list(.refs))]
    Deadlock {
        /// The refs stuck in pending.
        refs: Vec<ActionRef>,
    },

    /// Run-state bookkeeping rejected an operation.
    #[error(transparent)]
    State(#[from] ExecutionError),

    /// A spawned action task panicked or was aborted.
    #[error("action task failed: {0}")]
    Task(String),
}

fn refs_list(refs: &[ActionRef]) -> String {
    refs.iter()
        .map(ActionRef::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlock_names_stuck_refs() {
        let err = EngineError::Deadlock {
            refs: vec![ActionRef::new("a"), ActionRef::new("b")],
        };
        assert_eq!(
            err.to_string(),
            "deadlock: no runnable actions while still pending: a, b"
        );
    }

    #[test]
    fn workflow_errors_convert() {
        let err = EngineError::from(WorkflowError::Empty);
        assert!(err.to_string().contains("invalid workflow"));
    }
}
