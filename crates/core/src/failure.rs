//! Serializable failure descriptions.
//!
//! When an action fails and an error edge routes the failure downstream, the
//! child receives the failure as data: who failed ([`FailureMetadata::at`])
//! and why ([`FailureReason`]). These types are the wire shape of that data —
//! they appear in execution contexts and trace events alike.

use serde::{Deserialize, Serialize};

use crate::id::ActionRef;

/// Why an action failed, in a shape safe to serialize into traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReason {
    /// Human-readable failure message.
    pub message: String,
    /// Error type name (e.g. `"ValidationError"`, `"TimeoutError"`).
    pub name: String,
    /// Per-field detail for validation failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<String>,
}

impl FailureReason {
    /// Create a reason with a message and error type name.
    pub fn new(message: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: name.into(),
            field_errors: Vec::new(),
        }
    }

    /// Attach per-field validation errors.
    #[must_use]
    pub fn with_field_errors(mut self, field_errors: Vec<String>) -> Self {
        self.field_errors = field_errors;
        self
    }
}

/// An upstream failure as observed by a downstream action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureMetadata {
    /// The action that failed.
    pub at: ActionRef,
    /// Why it failed.
    pub reason: FailureReason,
}

impl FailureMetadata {
    /// Create failure metadata for the given action and reason.
    pub fn new(at: ActionRef, reason: FailureReason) -> Self {
        Self { at, reason }
    }
}
