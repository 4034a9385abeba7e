//! Status machines for runs and actions.

use serde::{Deserialize, Serialize};

/// The status of a single action within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Waiting on parents to settle.
    Pending,
    /// Join satisfied; queued for dispatch. Later parent settlements no
    /// longer affect readiness.
    Ready,
    /// Currently executing (includes awaiting an external input resolution).
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// No incoming edge was fulfilled; the action never ran.
    Skipped,
}

impl ActionStatus {
    /// Returns `true` once the action can no longer change status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// The overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but not yet started.
    Created,
    /// Actively executing actions.
    Running,
    /// Every reachable action completed and no failure was latched.
    Completed,
    /// At least one action failed, or an output reported a soft failure.
    Failed,
    /// The run exceeded its wall-clock budget.
    TimedOut,
    /// The run was cancelled externally.
    Cancelled,
}

impl RunStatus {
    /// Returns `true` once the run has reached a final status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    /// Returns `true` if the run finished successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
