//! The action runner: glue between the scheduler and one component
//! invocation.
//!
//! For each dispatched action the runner resolves inputs, materializes
//! spilled payloads, parses schemas, builds the execution context, invokes
//! the component, spills oversized outputs, and records the trace and
//! node-I/O events along the way. Failures are recorded and rethrown; the
//! scheduler routes them.

use std::collections::HashMap;
use std::sync::Arc;

use relay_component::{
    Component, ComponentError, ComponentOutput, ComponentRegistry, ExecuteArgs, PendingInput,
    mask_secrets,
};
use relay_core::{ActionRef, ENTRYPOINT_COMPONENT, FailureMetadata, RUNTIME_DATA_KEY, RunId,
    SELF_HANDLE, WorkflowId};
use relay_execution::{ActionOutcome, ContextMetadata, ExecutionContext};
use relay_storage::{ObjectStore, SecretStore, SpillMarker, StorageError, spill_value};
use relay_telemetry::{
    DraftEvent, EventContext, LogCollector, LogSink, NodeIoEvent, NodeIoSink, NodeIoStatus,
    TraceEventType, TraceLevel, TraceSequencer, cap_payload, summarize_output,
};
use relay_workflow::{NodeMetadata, WorkflowDefinition};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::gateway::{InputGateway, InputResolution};
use crate::resolver::{ResolveWarning, build_action_payload};

/// Why the scheduler launched an action: the triggering parent (for
/// any/first joins) and the upstream failure when reached via an error edge.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    /// The parent whose satisfaction made this action ready.
    pub triggered_by: Option<ActionRef>,
    /// Upstream failure carried in via a satisfied error edge.
    pub failure: Option<FailureMetadata>,
}

/// Everything one action invocation needs, snapshotted by the scheduler.
pub struct ActionJob {
    /// The run being executed.
    pub run_id: RunId,
    /// The workflow being executed.
    pub workflow_id: WorkflowId,
    /// The action to invoke.
    pub action_ref: ActionRef,
    /// The shared definition snapshot.
    pub definition: Arc<WorkflowDefinition>,
    /// Runtime inputs for entrypoint injection.
    pub runtime_inputs: Arc<Map<String, Value>>,
    /// Terminal outcomes of this action's dependencies.
    pub upstream: HashMap<ActionRef, ActionOutcome>,
    /// Why this action was launched.
    pub launch: LaunchContext,
    /// Observes run-level cancellation.
    pub cancellation: CancellationToken,
}

/// A successful invocation: the stored output (possibly a spill marker) and
/// the output ports a conditional component activated.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedAction {
    /// The value written to the results map.
    pub output: Value,
    /// Activated output ports; `None` fires all success edges.
    pub active_output_ports: Option<Vec<String>>,
}

/// Executes one action invocation end to end.
#[derive(Clone)]
pub struct ActionRunner {
    pub(crate) registry: Arc<ComponentRegistry>,
    pub(crate) trace: Arc<TraceSequencer>,
    pub(crate) node_io: Arc<dyn NodeIoSink>,
    pub(crate) log_sink: Arc<dyn LogSink>,
    pub(crate) storage: Arc<dyn ObjectStore>,
    pub(crate) secrets: Option<Arc<dyn SecretStore>>,
    pub(crate) artifacts: Option<Arc<dyn ObjectStore>>,
    pub(crate) gateway: Arc<dyn InputGateway>,
    pub(crate) config: EngineConfig,
}

impl ActionRunner {
    /// Run one action. Records `NODE_FAILED` and rethrows on any failure.
    pub async fn run_action(&self, job: ActionJob) -> Result<CompletedAction, ComponentError> {
        let metadata = job.definition.node_metadata(&job.action_ref);
        let event_context = EventContext::new(metadata.resolved_stream_id(), metadata.join_strategy)
            .with_triggered_by(job.launch.triggered_by.clone())
            .with_failure(job.launch.failure.clone());

        match self.execute_steps(&job, &metadata, &event_context).await {
            Ok(done) => Ok(done),
            Err(err) => {
                tracing::warn!(
                    run_id = %job.run_id,
                    node_ref = %job.action_ref,
                    error = %err,
                    "action_failed"
                );
                self.trace.record(
                    job.run_id,
                    DraftEvent::new(
                        job.action_ref.clone(),
                        TraceEventType::NodeFailed,
                        TraceLevel::Error,
                        event_context,
                    )
                    .with_message(err.to_string())
                    .with_error(err.to_reason()),
                );
                Err(err)
            }
        }
    }

    async fn execute_steps(
        &self,
        job: &ActionJob,
        metadata: &NodeMetadata,
        event_context: &EventContext,
    ) -> Result<CompletedAction, ComponentError> {
        let action = job
            .definition
            .action(&job.action_ref)
            .ok_or_else(|| ComponentError::not_found("action", job.action_ref.as_str()))?;
        let component = self.registry.get(&action.component_id)?;

        self.trace.record(
            job.run_id,
            DraftEvent::new(
                job.action_ref.clone(),
                TraceEventType::NodeStarted,
                TraceLevel::Info,
                event_context.clone(),
            ),
        );
        tracing::debug!(
            run_id = %job.run_id,
            node_ref = %job.action_ref,
            component_id = %action.component_id,
            "action_started"
        );

        let resolved = build_action_payload(action, &job.upstream, component.as_ref());
        for manual in &resolved.manual_overrides {
            self.trace.record(
                job.run_id,
                DraftEvent::new(
                    job.action_ref.clone(),
                    TraceEventType::NodeProgress,
                    TraceLevel::Debug,
                    event_context.clone(),
                )
                .with_message(format!("manual value kept for input '{}'", manual.target))
                .with_data(json!({
                    "target": manual.target,
                    "sourceRef": manual.source_ref,
                })),
            );
        }
        for warning in &resolved.warnings {
            self.trace.record(
                job.run_id,
                DraftEvent::new(
                    job.action_ref.clone(),
                    TraceEventType::NodeProgress,
                    TraceLevel::Warn,
                    event_context.clone(),
                )
                .with_message(warning.message())
                .with_data(json!({
                    "target": warning.target,
                    "sourceRef": warning.source_ref,
                    "sourceHandle": warning.source_handle,
                })),
            );
        }
        if !resolved.warnings.is_empty() {
            let field_errors: Vec<String> =
                resolved.warnings.iter().map(ResolveWarning::message).collect();
            return Err(ComponentError::validation(
                field_errors.join("; "),
                field_errors,
            ));
        }

        let mut inputs = resolved.inputs;
        let params = resolved.params;
        self.materialize_spilled(&mut inputs).await?;

        if job.action_ref == job.definition.entrypoint.action_ref {
            if action.component_id.as_str() == ENTRYPOINT_COMPONENT {
                inputs.insert(
                    RUNTIME_DATA_KEY.to_owned(),
                    Value::Object((*job.runtime_inputs).clone()),
                );
            } else {
                tracing::error!(
                    run_id = %job.run_id,
                    node_ref = %job.action_ref,
                    component_id = %action.component_id,
                    "entrypoint ref is not bound to the entrypoint component; runtime inputs not injected"
                );
            }
        }

        let parsed_inputs = component.inputs().parse(&Value::Object(inputs))?;
        let parsed_params = match component.parameters() {
            Some(schema) => schema.parse(&Value::Object(params))?,
            None => Value::Object(params),
        };

        let ctx = self.build_context(job, metadata, &component)?;

        let masked_inputs = mask_secrets(component.inputs(), &parsed_inputs);
        self.node_io.append(NodeIoEvent::Start {
            run_id: job.run_id,
            node_ref: job.action_ref.clone(),
            workflow_id: Some(job.workflow_id.clone()),
            component_id: Some(action.component_id.clone()),
            inputs: cap_payload(&masked_inputs),
        });

        let result = self
            .invoke(job, component.as_ref(), parsed_inputs, parsed_params, ctx, event_context)
            .await;
        if let Err(err) = &result {
            self.node_io.append(NodeIoEvent::Completion {
                run_id: job.run_id,
                node_ref: job.action_ref.clone(),
                outputs: Value::Null,
                status: NodeIoStatus::Failed,
                error_message: Some(err.to_string()),
            });
        }
        result
    }

    async fn invoke(
        &self,
        job: &ActionJob,
        component: &dyn Component,
        inputs: Value,
        params: Value,
        ctx: ExecutionContext,
        event_context: &EventContext,
    ) -> Result<CompletedAction, ComponentError> {
        let output = component
            .execute(ExecuteArgs { inputs, params }, ctx)
            .await?;

        let (raw_output, active_ports) = match output {
            ComponentOutput::Value(value) => (value, None),
            ComponentOutput::Routed {
                value,
                active_ports,
            } => (value, Some(active_ports)),
            ComponentOutput::Pending(pending) => {
                self.trace.record(
                    job.run_id,
                    DraftEvent::new(
                        job.action_ref.clone(),
                        TraceEventType::AwaitingInput,
                        TraceLevel::Info,
                        event_context.clone(),
                    )
                    .with_message(pending.title.clone())
                    .with_data(serde_json::to_value(&pending).unwrap_or(Value::Null)),
                );
                let resolution = self.await_resolution(job, pending).await?;
                let ports = resolution.active_ports();
                (resolution.into_output(), Some(ports))
            }
        };

        let parsed_output = component.outputs().parse(&raw_output)?;
        let serialized_len = serde_json::to_vec(&parsed_output).map_or(0, |v| v.len());
        let stored_output = if serialized_len > self.config.spill_threshold_bytes {
            let marker = spill_value(self.storage.as_ref(), &parsed_output)
                .await
                .map_err(Self::storage_error)?;
            tracing::debug!(
                run_id = %job.run_id,
                node_ref = %job.action_ref,
                size = marker.original_size,
                storage_ref = %marker.storage_ref,
                "output_spilled"
            );
            marker.to_value()
        } else {
            parsed_output.clone()
        };

        let masked_output = mask_secrets(component.outputs(), &parsed_output);
        self.node_io.append(NodeIoEvent::Completion {
            run_id: job.run_id,
            node_ref: job.action_ref.clone(),
            outputs: cap_payload(&masked_output),
            status: NodeIoStatus::Completed,
            error_message: None,
        });

        self.trace.record(
            job.run_id,
            DraftEvent::new(
                job.action_ref.clone(),
                TraceEventType::NodeCompleted,
                TraceLevel::Info,
                event_context.clone(),
            )
            .with_summary(summarize_output(&masked_output)),
        );
        tracing::info!(run_id = %job.run_id, node_ref = %job.action_ref, "action_completed");

        Ok(CompletedAction {
            output: stored_output,
            active_output_ports: active_ports,
        })
    }

    /// Download and inline every tagged spill marker, caching per storage ref
    /// for the duration of the action.
    async fn materialize_spilled(
        &self,
        inputs: &mut Map<String, Value>,
    ) -> Result<(), ComponentError> {
        let mut cache: HashMap<String, Value> = HashMap::new();
        for value in inputs.values_mut() {
            let Some(marker) = SpillMarker::from_value(value) else {
                continue;
            };
            if !cache.contains_key(&marker.storage_ref) {
                let object = self
                    .storage
                    .download(&marker.storage_ref)
                    .await
                    .map_err(Self::storage_error)?;
                let payload: Value = serde_json::from_slice(&object.bytes).map_err(|err| {
                    ComponentError::failed(format!("spilled payload is not valid JSON: {err}"))
                })?;
                cache.insert(marker.storage_ref.clone(), payload);
            }
            let payload = &cache[&marker.storage_ref];
            *value = match marker.handle.as_deref() {
                None | Some(SELF_HANDLE) => payload.clone(),
                Some(handle) => payload.get(handle).cloned().unwrap_or(Value::Null),
            };
        }
        Ok(())
    }

    async fn await_resolution(
        &self,
        job: &ActionJob,
        pending: PendingInput,
    ) -> Result<InputResolution, ComponentError> {
        let deadline = pending.timeout_at;
        let request = self.gateway.request(job.run_id, &job.action_ref, pending);
        match deadline {
            None => request.await,
            Some(at) => {
                let remaining = (at - chrono::Utc::now())
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);
                match tokio::time::timeout(remaining, request).await {
                    Ok(result) => result,
                    Err(_) => Err(ComponentError::Timeout(format!(
                        "input request for '{}' expired",
                        job.action_ref
                    ))),
                }
            }
        }
    }

    fn build_context(
        &self,
        job: &ActionJob,
        metadata: &NodeMetadata,
        component: &Arc<dyn Component>,
    ) -> Result<ExecutionContext, ComponentError> {
        let mut ctx = ExecutionContext::new(
            job.run_id,
            job.action_ref.clone(),
            ContextMetadata {
                stream_id: metadata.resolved_stream_id(),
                join_strategy: metadata.join_strategy,
                correlation_id: format!("{}:{}", job.run_id, job.action_ref),
                triggered_by: job.launch.triggered_by.clone(),
                failure: job.launch.failure.clone(),
            },
        )
        .with_storage(self.storage.clone())
        .with_trace(self.trace.clone())
        .with_logs(LogCollector::new(
            job.run_id,
            job.action_ref.clone(),
            self.log_sink.clone(),
        ))
        .with_cancellation(job.cancellation.clone());

        if let Some(artifacts) = &self.artifacts {
            ctx = ctx.with_artifacts(artifacts.clone());
        }
        if component.requires_secrets() {
            let secrets = self.secrets.clone().ok_or_else(|| {
                ComponentError::Configuration(format!(
                    "component '{}' requires secrets but no secret store is configured",
                    component.id()
                ))
            })?;
            ctx = ctx.with_secrets(secrets);
        }
        Ok(ctx)
    }

    fn storage_error(err: StorageError) -> ComponentError {
        match err {
            StorageError::NotFound(id) => ComponentError::not_found("object", id),
            other => ComponentError::retryable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::UnconfiguredGateway;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use relay_component::builtin::register_builtins;
    use relay_component::{ConnectionType, PortSpec, Schema};
    use relay_core::ComponentId;
    use relay_storage::MemoryObjectStore;
    use relay_telemetry::{MemoryLogSink, MemoryNodeIoSink, MemoryTraceSink};
    use relay_workflow::{ActionDefinition, Entrypoint, InputMapping, WorkflowConfig};

    struct SecretEchoComponent {
        id: ComponentId,
        inputs: Schema,
        outputs: Schema,
    }

    impl SecretEchoComponent {
        fn new() -> Self {
            Self {
                id: ComponentId::new("test.secret-echo"),
                inputs: Schema::new(vec![
                    PortSpec::new("token", ConnectionType::Secret),
                    PortSpec::new("name", ConnectionType::Text),
                ]),
                outputs: Schema::new(vec![
                    PortSpec::new("token", ConnectionType::Secret),
                    PortSpec::new("name", ConnectionType::Text),
                ]),
            }
        }
    }

    #[async_trait]
    impl Component for SecretEchoComponent {
        fn id(&self) -> &ComponentId {
            &self.id
        }
        fn inputs(&self) -> &Schema {
            &self.inputs
        }
        fn outputs(&self) -> &Schema {
            &self.outputs
        }
        async fn execute(
            &self,
            args: ExecuteArgs,
            _ctx: ExecutionContext,
        ) -> Result<ComponentOutput, ComponentError> {
            Ok(ComponentOutput::value(args.inputs))
        }
    }

    struct Fixture {
        runner: ActionRunner,
        trace_sink: Arc<MemoryTraceSink>,
        node_io: Arc<MemoryNodeIoSink>,
        storage: Arc<MemoryObjectStore>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ComponentRegistry::new());
        register_builtins(&registry);
        registry.register(Arc::new(SecretEchoComponent::new()));

        let trace_sink = Arc::new(MemoryTraceSink::new());
        let node_io = Arc::new(MemoryNodeIoSink::new());
        let storage = Arc::new(MemoryObjectStore::new());
        let runner = ActionRunner {
            registry,
            trace: Arc::new(TraceSequencer::new(trace_sink.clone())),
            node_io: node_io.clone(),
            log_sink: Arc::new(MemoryLogSink::new()),
            storage: storage.clone(),
            secrets: None,
            artifacts: None,
            gateway: Arc::new(UnconfiguredGateway),
            config: EngineConfig::default(),
        };
        Fixture {
            runner,
            trace_sink,
            node_io,
            storage,
        }
    }

    fn definition(actions: Vec<ActionDefinition>) -> Arc<WorkflowDefinition> {
        let entry = actions[0].action_ref.clone();
        Arc::new(WorkflowDefinition {
            version: 1,
            title: "test".into(),
            entrypoint: Entrypoint { action_ref: entry },
            nodes: HashMap::new(),
            edges: vec![],
            dependency_counts: HashMap::new(),
            actions,
            config: WorkflowConfig::default(),
        })
    }

    fn simple_action(r: &str, component_id: &str) -> ActionDefinition {
        ActionDefinition {
            action_ref: ActionRef::new(r),
            component_id: ComponentId::new(component_id),
            params: Map::new(),
            input_overrides: Map::new(),
            depends_on: vec![],
            input_mappings: HashMap::new(),
            retry_policy: None,
        }
    }

    fn job(definition: &Arc<WorkflowDefinition>, r: &str) -> ActionJob {
        ActionJob {
            run_id: RunId::new(),
            workflow_id: WorkflowId::new("wf"),
            action_ref: ActionRef::new(r),
            definition: definition.clone(),
            runtime_inputs: Arc::new(Map::new()),
            upstream: HashMap::new(),
            launch: LaunchContext::default(),
            cancellation: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn unknown_component_fails_with_not_found_and_node_failed() {
        let fx = fixture();
        let def = definition(vec![simple_action("start", "core.ghost")]);
        let job = job(&def, "start");
        let run_id = job.run_id;

        let err = fx.runner.run_action(job).await.unwrap_err();
        assert!(matches!(err, ComponentError::NotFound { .. }));

        let events = fx.trace_sink.for_run(run_id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, TraceEventType::NodeFailed);
        assert_eq!(events[0].error.as_ref().unwrap().name, "NotFoundError");
    }

    #[tokio::test]
    async fn unresolved_mapping_warns_then_fails_validation() {
        let fx = fixture();
        let mut sink = simple_action("sink", "core.console.log");
        sink.depends_on = vec![ActionRef::new("up")];
        sink.input_mappings.insert(
            "label".into(),
            InputMapping {
                source_ref: ActionRef::new("up"),
                source_handle: "missing-handle".into(),
            },
        );
        let def = definition(vec![simple_action("up", "core.util.passthrough"), sink]);

        let mut job = job(&def, "sink");
        job.upstream.insert(
            ActionRef::new("up"),
            ActionOutcome::completed(json!({"other": 1})),
        );
        let run_id = job.run_id;

        let err = fx.runner.run_action(job).await.unwrap_err();
        assert!(err.to_string().contains("Input 'label'"));
        match &err {
            ComponentError::Validation { field_errors, .. } => {
                assert_eq!(field_errors.len(), 1);
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let events = fx.trace_sink.for_run(run_id);
        let types: Vec<TraceEventType> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                TraceEventType::NodeStarted,
                TraceEventType::NodeProgress,
                TraceEventType::NodeFailed,
            ]
        );
        assert_eq!(events[1].level, TraceLevel::Warn);
    }

    #[tokio::test]
    async fn entrypoint_receives_runtime_inputs() {
        let fx = fixture();
        let def = definition(vec![simple_action("start", ENTRYPOINT_COMPONENT)]);
        let mut job = job(&def, "start");
        let mut inputs = Map::new();
        inputs.insert("user".into(), json!("ada"));
        job.runtime_inputs = Arc::new(inputs);

        let done = fx.runner.run_action(job).await.unwrap();
        assert_eq!(done.output, json!({"user": "ada"}));
    }

    #[tokio::test]
    async fn secret_ports_are_masked_in_node_io() {
        let fx = fixture();
        let mut action = simple_action("start", "test.secret-echo");
        action.input_overrides.insert("token".into(), json!("hunter2"));
        action.input_overrides.insert("name".into(), json!("ada"));
        let def = definition(vec![action]);
        let run_id;
        {
            let job = job(&def, "start");
            run_id = job.run_id;
            fx.runner.run_action(job).await.unwrap();
        }

        for event in fx.node_io.events() {
            let payload = match &event {
                NodeIoEvent::Start { inputs, .. } => inputs,
                NodeIoEvent::Completion { outputs, .. } => outputs,
            };
            assert_eq!(payload["token"], "***", "cleartext leaked: {event:?}");
            assert_eq!(payload["name"], "ada");
        }

        // The completion summary is built from the masked output too.
        let events = fx.trace_sink.for_run(run_id);
        let completed = events
            .iter()
            .find(|e| e.event_type == TraceEventType::NodeCompleted)
            .unwrap();
        assert_eq!(completed.output_summary.as_ref().unwrap()["token"], "***");
    }

    #[tokio::test]
    async fn oversized_output_is_spilled_to_storage() {
        let fx = fixture();
        let mut action = simple_action("start", "core.util.passthrough");
        action
            .input_overrides
            .insert("blob".into(), json!("x".repeat(200 * 1024)));
        let def = definition(vec![action]);

        let done = fx.runner.run_action(job(&def, "start")).await.unwrap();
        let marker = SpillMarker::from_value(&done.output).expect("expected a spill marker");
        assert!(marker.original_size > 100 * 1024);
        assert_eq!(fx.storage.len(), 1);
    }
}
