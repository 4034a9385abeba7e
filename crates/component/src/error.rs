//! Component error taxonomy.
//!
//! Every failure surfaced by a component or its invocation machinery maps to
//! one of these kinds. Only `Service { retryable: true }` errors may be
//! retried by an outer durable harness; the scheduler itself never retries.

use relay_core::FailureReason;
use thiserror::Error;

/// Errors raised by component lookup, parsing, and execution.
#[derive(Debug, Clone, Error)]
pub enum ComponentError {
    /// Inputs, params, or outputs failed schema validation. Non-retryable.
    #[error("{message}")]
    Validation {
        /// Summary of what failed.
        message: String,
        /// Per-field detail.
        field_errors: Vec<String>,
    },

    /// A referenced component, action, file, or artifact is absent.
    /// Non-retryable.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of thing is missing.
        kind: String,
        /// Its identifier.
        id: String,
    },

    /// Required environment wiring is missing. Fatal to the worker process.
    #[error("configuration: {0}")]
    Configuration(String),

    /// A run, action, or human-input deadline expired. Non-retryable.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A transient integration failure.
    #[error("service error: {message}")]
    Service {
        /// What went wrong.
        message: String,
        /// Whether an outer harness may retry.
        retryable: bool,
    },

    /// Any other component failure.
    #[error("{0}")]
    Failed(String),
}

impl ComponentError {
    /// A validation failure with per-field detail.
    pub fn validation(message: impl Into<String>, field_errors: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors,
        }
    }

    /// A missing-resource failure.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// A retryable transient failure.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            retryable: true,
        }
    }

    /// A generic component failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Whether an outer harness may retry this failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Service { retryable: true, .. })
    }

    /// The error type name surfaced in traces and failure metadata.
    #[must_use]
    pub fn error_name(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::NotFound { .. } => "NotFoundError",
            Self::Configuration(_) => "ConfigurationError",
            Self::Timeout(_) => "TimeoutError",
            Self::Service { .. } => "ServiceError",
            Self::Failed(_) => "Error",
        }
    }

    /// The serializable failure reason for traces and error-edge routing.
    #[must_use]
    pub fn to_reason(&self) -> FailureReason {
        let reason = FailureReason::new(self.to_string(), self.error_name());
        match self {
            Self::Validation { field_errors, .. } => {
                reason.with_field_errors(field_errors.clone())
            }
            _ => reason,
        }
    }
}
