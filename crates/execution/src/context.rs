//! Per-invocation execution context.
//!
//! One context is constructed for each action invocation and never mutated
//! afterwards. It carries identity, scheduling metadata, and the capability
//! handles the component is allowed to touch — `secrets` only when the
//! component declares it needs them.

use std::sync::Arc;

use relay_core::{ActionRef, FailureMetadata, RunId};
use relay_storage::{ObjectStore, SecretStore};
use relay_telemetry::{EventContext, LogCollector, TraceSequencer};
use relay_workflow::JoinStrategy;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionError;

/// Scheduling metadata visible to the component.
#[derive(Debug, Clone)]
pub struct ContextMetadata {
    /// Logical stream grouping related trace and log events.
    pub stream_id: String,
    /// The node's fan-in rule.
    pub join_strategy: JoinStrategy,
    /// Correlates every event of this invocation.
    pub correlation_id: String,
    /// The parent whose completion made this node ready (any/first joins).
    pub triggered_by: Option<ActionRef>,
    /// Upstream failure when this node was reached via an error edge.
    pub failure: Option<FailureMetadata>,
}

impl ContextMetadata {
    /// The trace-event context corresponding to this metadata.
    #[must_use]
    pub fn event_context(&self) -> EventContext {
        EventContext::new(self.stream_id.clone(), self.join_strategy)
            .with_triggered_by(self.triggered_by.clone())
            .with_failure(self.failure.clone())
    }
}

/// The immutable handle an action invocation executes under.
#[derive(Clone)]
pub struct ExecutionContext {
    /// The run this invocation belongs to.
    pub run_id: RunId,
    /// Ref of the action being invoked.
    pub component_ref: ActionRef,
    /// Scheduling metadata.
    pub metadata: ContextMetadata,
    /// Payload storage, when configured.
    pub storage: Option<Arc<dyn ObjectStore>>,
    /// Secret resolution; present only for components that require secrets.
    pub secrets: Option<Arc<dyn SecretStore>>,
    /// Artifact storage, when configured.
    pub artifacts: Option<Arc<dyn ObjectStore>>,
    /// Trace recording for component-emitted progress events.
    pub trace: Option<Arc<TraceSequencer>>,
    /// Structured log handle.
    pub logs: Option<LogCollector>,
    /// Observes run-level cancellation and timeout.
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    /// Create a context with no capability handles attached.
    #[must_use]
    pub fn new(run_id: RunId, component_ref: ActionRef, metadata: ContextMetadata) -> Self {
        Self {
            run_id,
            component_ref,
            metadata,
            storage: None,
            secrets: None,
            artifacts: None,
            trace: None,
            logs: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attach payload storage.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Attach secret resolution.
    #[must_use]
    pub fn with_secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Attach artifact storage.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Arc<dyn ObjectStore>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Attach the trace sequencer.
    #[must_use]
    pub fn with_trace(mut self, trace: Arc<TraceSequencer>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Attach a log collector.
    #[must_use]
    pub fn with_logs(mut self, logs: LogCollector) -> Self {
        self.logs = Some(logs);
        self
    }

    /// Attach the run's cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Whether run-level cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Error if run-level cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<(), ExecutionError> {
        if self.cancellation.is_cancelled() {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .field("component_ref", &self.component_ref)
            .field("metadata", &self.metadata)
            .field("has_storage", &self.storage.is_some())
            .field("has_secrets", &self.secrets.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relay_storage::MemoryObjectStore;

    fn metadata() -> ContextMetadata {
        ContextMetadata {
            stream_id: "s1".into(),
            join_strategy: JoinStrategy::All,
            correlation_id: "run:node".into(),
            triggered_by: None,
            failure: None,
        }
    }

    #[test]
    fn new_context_has_no_capabilities() {
        let ctx = ExecutionContext::new(RunId::new(), ActionRef::new("a"), metadata());
        assert!(ctx.storage.is_none());
        assert!(ctx.secrets.is_none());
        assert!(ctx.artifacts.is_none());
        assert!(ctx.trace.is_none());
        assert!(ctx.logs.is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn builders_attach_capabilities() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let ctx = ExecutionContext::new(RunId::new(), ActionRef::new("a"), metadata())
            .with_storage(store.clone())
            .with_artifacts(store);
        assert!(ctx.storage.is_some());
        assert!(ctx.artifacts.is_some());
        assert!(ctx.secrets.is_none());
    }

    #[test]
    fn cancellation_is_observable() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::new(RunId::new(), ActionRef::new("a"), metadata())
            .with_cancellation(token.clone());
        assert!(ctx.check_cancelled().is_ok());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(
            ctx.check_cancelled().unwrap_err(),
            ExecutionError::Cancelled
        ));
    }

    #[test]
    fn event_context_mirrors_metadata() {
        let mut meta = metadata();
        meta.triggered_by = Some(ActionRef::new("fast"));
        let event_ctx = meta.event_context();
        assert_eq!(event_ctx.stream_id, "s1");
        assert_eq!(event_ctx.triggered_by, Some(ActionRef::new("fast")));
        assert!(event_ctx.failure.is_none());
    }
}
