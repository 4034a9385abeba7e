//! Terminal outcomes of actions and edges.

use relay_core::FailureReason;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::ActionStatus;

/// How a parent settled one child's incoming edge relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOutcome {
    /// The edge fired; the parent's contribution counts toward the join.
    Satisfied,
    /// The parent failed with no error-edge path to this child.
    Failed,
    /// The edge will never fire (inactive port, failed source on a success
    /// edge, completed source on an error edge, or skipped source).
    Cancelled,
}

/// The terminal result of one action, stored once in the run's results map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    /// Terminal status.
    pub status: ActionStatus,
    /// Parsed output, present on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Failure description, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureReason>,
    /// Output ports a conditional component activated; `None` fires all
    /// success edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_output_ports: Option<Vec<String>>,
}

impl ActionOutcome {
    /// A successful completion firing all success edges.
    #[must_use]
    pub fn completed(output: Value) -> Self {
        Self {
            status: ActionStatus::Completed,
            output: Some(output),
            error: None,
            active_output_ports: None,
        }
    }

    /// A successful completion firing only the named output ports.
    #[must_use]
    pub fn completed_with_ports(output: Value, active_output_ports: Vec<String>) -> Self {
        Self {
            status: ActionStatus::Completed,
            output: Some(output),
            error: None,
            active_output_ports: Some(active_output_ports),
        }
    }

    /// A failure.
    #[must_use]
    pub fn failed(error: FailureReason) -> Self {
        Self {
            status: ActionStatus::Failed,
            output: None,
            error: Some(error),
            active_output_ports: None,
        }
    }

    /// A skip: no incoming edge was fulfilled.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            status: ActionStatus::Skipped,
            output: None,
            error: None,
            active_output_ports: None,
        }
    }

    /// Returns `true` if the action completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == ActionStatus::Completed
    }

    /// Returns `true` if the action failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == ActionStatus::Failed
    }

    /// Detect a soft failure reported inside a completed output.
    ///
    /// Components may report failure within their declared contract as
    /// `{success: false, error: …}`. Such outputs route like successes but
    /// flip the run to failed at termination; the returned message is the
    /// aggregation input.
    #[must_use]
    pub fn soft_failure(&self) -> Option<String> {
        let output = self.output.as_ref()?.as_object()?;
        if output.get("success")?.as_bool() != Some(false) {
            return None;
        }
        let error = output.get("error")?;
        let message = match error {
            Value::String(s) => s.clone(),
            Value::Object(o) => o
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| error.to_string(), str::to_owned),
            other => other.to_string(),
        };
        Some(message)
    }
}
