//! The indegree-driven DAG scheduler.
//!
//! One `execute` call drives one run: dispatch ready actions concurrently up
//! to the configured cap, join on completions, settle each completion's
//! outgoing edges, evaluate joins, cascade skips, and terminate when every
//! reachable action is terminal. All per-run state lives in a [`RunState`]
//! owned by this loop; action bodies run off to the side and report back
//! through their task results.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use relay_component::{ComponentError, ComponentRegistry};
use relay_core::{ActionRef, FailureReason, RunId};
use relay_execution::{ActionOutcome, ActionStatus, RunState, RunStatus};
use relay_storage::{ObjectStore, SecretStore};
use relay_telemetry::{
    DraftEvent, EventContext, LogSink, NodeIoSink, RunMetadata, TraceEventType, TraceLevel,
    TraceSequencer,
};
use relay_workflow::{DependencyGraph, Edge, WorkflowDefinition};
use serde_json::Value;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gateway::{InputGateway, UnconfiguredGateway};
use crate::routing::{JoinDecision, evaluate_join, settle_edges};
use crate::run::{RunRequest, RunResult};
use crate::runner::{ActionJob, ActionRunner, CompletedAction, LaunchContext};

enum TaskOutput {
    Finished(Result<CompletedAction, ComponentError>),
    Cancelled,
}

/// Drives runs of workflow definitions to completion.
pub struct Scheduler {
    runner: ActionRunner,
    trace: Arc<TraceSequencer>,
    config: EngineConfig,
}

impl Scheduler {
    /// Create a scheduler with the required collaborators and defaults for
    /// the rest: no secrets, no artifacts, an unconfigured input gateway,
    /// and the default [`EngineConfig`].
    pub fn new(
        registry: Arc<ComponentRegistry>,
        trace: Arc<TraceSequencer>,
        node_io: Arc<dyn NodeIoSink>,
        log_sink: Arc<dyn LogSink>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        let config = EngineConfig::default();
        Self {
            runner: ActionRunner {
                registry,
                trace: trace.clone(),
                node_io,
                log_sink,
                storage,
                secrets: None,
                artifacts: None,
                gateway: Arc::new(UnconfiguredGateway),
                config: config.clone(),
            },
            trace,
            config,
        }
    }

    /// Replace the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.runner.config = config.clone();
        self.config = config;
        self
    }

    /// Attach a secret store.
    #[must_use]
    pub fn with_secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.runner.secrets = Some(secrets);
        self
    }

    /// Attach artifact storage.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Arc<dyn ObjectStore>) -> Self {
        self.runner.artifacts = Some(artifacts);
        self
    }

    /// Attach an input gateway for awaiting-input actions.
    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn InputGateway>) -> Self {
        self.runner.gateway = gateway;
        self
    }

    /// Execute one run to completion.
    ///
    /// Component failures do not error this call — they become failed
    /// outcomes, route along error edges, and surface in the result's
    /// `success`/`error`. An `Err` means the run itself could not be driven:
    /// an invalid definition or a scheduler invariant violation.
    pub async fn execute(&self, request: RunRequest) -> Result<RunResult, EngineError> {
        let definition = request.definition.clone();
        DependencyGraph::from_definition(&definition)?;

        let run_id = request.run_id;
        self.trace.set_run_metadata(
            run_id,
            RunMetadata {
                workflow_id: request.workflow_id.clone(),
                organization_id: request.organization_id.clone(),
            },
        );

        let mut state = RunState::new(
            run_id,
            definition
                .actions
                .iter()
                .map(|a| (a.action_ref.clone(), definition.indegree(&a.action_ref))),
        );
        state.transition_status(RunStatus::Running)?;
        tracing::info!(
            run_id = %run_id,
            workflow_id = %request.workflow_id,
            title = %definition.title,
            "run_started"
        );

        let cancellation = CancellationToken::new();
        let mut timeout_guard = definition.config.timeout_seconds.map(|secs| {
            let token = cancellation.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
                token.cancel();
            })
        });

        // FIFO in definition order keeps dispatch deterministic.
        let mut ready: VecDeque<(ActionRef, LaunchContext)> = VecDeque::new();
        for action in &definition.actions {
            if state
                .action(&action.action_ref)
                .is_some_and(|s| s.remaining == 0)
            {
                state
                    .action_mut(&action.action_ref)?
                    .transition_to(ActionStatus::Ready)?;
                ready.push_back((action.action_ref.clone(), LaunchContext::default()));
            }
        }

        let runtime_inputs = Arc::new(request.inputs.clone());
        let cap = self.config.max_concurrency.max(1);
        let mut inflight: JoinSet<(ActionRef, TaskOutput)> = JoinSet::new();

        loop {
            while inflight.len() < cap {
                let Some((action_ref, launch)) = ready.pop_front() else {
                    break;
                };

                if cancellation.is_cancelled() {
                    // The run expired before this action could start.
                    let reason = FailureReason::new("run timed out", "TimeoutError");
                    self.record_cancel_failure(&definition, run_id, &action_ref, &reason);
                    let outcome = ActionOutcome::failed(reason);
                    state.record_result(&action_ref, outcome.clone())?;
                    self.edge_fanout(&definition, &mut state, &mut ready, &action_ref, &outcome)?;
                    continue;
                }

                state
                    .action_mut(&action_ref)?
                    .transition_to(ActionStatus::Running)?;

                let upstream = self.upstream_snapshot(&definition, &state, &action_ref);
                let job = ActionJob {
                    run_id,
                    workflow_id: request.workflow_id.clone(),
                    action_ref: action_ref.clone(),
                    definition: definition.clone(),
                    runtime_inputs: runtime_inputs.clone(),
                    upstream,
                    launch,
                    cancellation: cancellation.child_token(),
                };
                let runner = self.runner.clone();
                let token = cancellation.clone();
                inflight.spawn(async move {
                    tokio::select! {
                        result = runner.run_action(job) => (action_ref, TaskOutput::Finished(result)),
                        () = token.cancelled() => (action_ref, TaskOutput::Cancelled),
                    }
                });
            }

            if inflight.is_empty() {
                if ready.is_empty() {
                    break;
                }
                continue;
            }

            let Some(joined) = inflight.join_next().await else {
                continue;
            };
            let (action_ref, task_output) =
                joined.map_err(|err| EngineError::Task(err.to_string()))?;

            let outcome = match task_output {
                TaskOutput::Finished(Ok(done)) => match done.active_output_ports {
                    Some(ports) => ActionOutcome::completed_with_ports(done.output, ports),
                    None => ActionOutcome::completed(done.output),
                },
                TaskOutput::Finished(Err(err)) => ActionOutcome::failed(err.to_reason()),
                TaskOutput::Cancelled => {
                    // The runner future was dropped mid-flight, so its
                    // failure events were never recorded.
                    let reason = FailureReason::new("run timed out", "TimeoutError");
                    self.record_cancel_failure(&definition, run_id, &action_ref, &reason);
                    ActionOutcome::failed(reason)
                }
            };

            state.record_result(&action_ref, outcome.clone())?;
            self.edge_fanout(&definition, &mut state, &mut ready, &action_ref, &outcome)?;
        }

        if let Some(handle) = timeout_guard.take() {
            handle.abort();
        }

        let stuck = state.pending_refs();
        if !stuck.is_empty() {
            state.transition_status(RunStatus::Failed)?;
            self.trace.finalize_run(run_id);
            tracing::error!(run_id = %run_id, stuck = ?stuck, "run_deadlocked");
            return Err(EngineError::Deadlock { refs: stuck });
        }

        let mut failures: Vec<String> = Vec::new();
        for action in &definition.actions {
            if let Some(outcome) = state.result(&action.action_ref) {
                if let Some(error) = &outcome.error {
                    failures.push(format!("[{}] {}", action.action_ref, error.message));
                } else if let Some(message) = outcome.soft_failure() {
                    failures.push(format!("[{}] {}", action.action_ref, message));
                }
            }
        }
        let success = failures.is_empty();
        let final_status = if success {
            RunStatus::Completed
        } else if cancellation.is_cancelled() {
            RunStatus::TimedOut
        } else {
            RunStatus::Failed
        };
        state.transition_status(final_status)?;
        tracing::info!(run_id = %run_id, status = %state.status(), success, "run_finished");
        self.trace.finalize_run(run_id);

        Ok(RunResult {
            outputs: state.outputs(),
            success,
            error: if success {
                None
            } else {
                Some(failures.join("; "))
            },
        })
    }

    /// Clone the terminal outcomes of an action's dependencies.
    ///
    /// Results are single-assign and parents settle before their children
    /// dispatch, so the snapshot is consistent. Under an any/first join an
    /// unsettled parent is simply absent; mappings from it resolve to
    /// warnings.
    fn upstream_snapshot(
        &self,
        definition: &WorkflowDefinition,
        state: &RunState,
        action_ref: &ActionRef,
    ) -> HashMap<ActionRef, ActionOutcome> {
        definition
            .action(action_ref)
            .map(|action| {
                action
                    .depends_on
                    .iter()
                    .filter_map(|dep| state.result(dep).map(|o| (dep.clone(), o.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Settle a terminal action's outgoing edges, enqueue children that
    /// became ready, and cascade skips.
    fn edge_fanout(
        &self,
        definition: &WorkflowDefinition,
        state: &mut RunState,
        ready: &mut VecDeque<(ActionRef, LaunchContext)>,
        parent_ref: &ActionRef,
        outcome: &ActionOutcome,
    ) -> Result<(), EngineError> {
        let mut worklist: VecDeque<(ActionRef, ActionOutcome)> =
            VecDeque::from([(parent_ref.clone(), outcome.clone())]);

        while let Some((parent, parent_outcome)) = worklist.pop_front() {
            let mut order: Vec<ActionRef> = Vec::new();
            let mut by_child: HashMap<ActionRef, Vec<&Edge>> = HashMap::new();
            for edge in definition.outgoing_edges(&parent) {
                let entry = by_child.entry(edge.target_ref.clone()).or_default();
                if entry.is_empty() {
                    order.push(edge.target_ref.clone());
                }
                entry.push(edge);
            }

            for child in order {
                let (edge_outcome, failure_meta) =
                    settle_edges(&parent, &parent_outcome, &by_child[&child]);

                let decision = {
                    let child_state = state.action_mut(&child)?;
                    child_state.record_parent(&child, parent.clone(), edge_outcome)?;
                    if child_state.status != ActionStatus::Pending {
                        // Already dispatched or terminal; settlement was
                        // bookkeeping only.
                        continue;
                    }
                    if child_state.failure.is_none()
                        && let Some(meta) = failure_meta
                    {
                        child_state.failure = Some(meta);
                    }
                    let node_meta = definition.node_metadata(&child);
                    evaluate_join(
                        node_meta.join_strategy,
                        child_state.indegree,
                        &child_state.parent_outcomes,
                    )
                };

                match decision {
                    JoinDecision::Wait => {}
                    JoinDecision::Ready { triggered_by } => {
                        let child_state = state.action_mut(&child)?;
                        child_state.transition_to(ActionStatus::Ready)?;
                        child_state.triggered_by = triggered_by.clone();
                        let failure = child_state.failure.clone();
                        ready.push_back((
                            child.clone(),
                            LaunchContext {
                                triggered_by,
                                failure,
                            },
                        ));
                    }
                    JoinDecision::Skip => {
                        let skipped = ActionOutcome::skipped();
                        state.record_result(&child, skipped.clone())?;
                        let node_meta = definition.node_metadata(&child);
                        self.trace.record(
                            state.run_id,
                            DraftEvent::new(
                                child.clone(),
                                TraceEventType::NodeSkipped,
                                TraceLevel::Info,
                                EventContext::new(
                                    node_meta.resolved_stream_id(),
                                    node_meta.join_strategy,
                                ),
                            )
                            .with_message("no incoming edge was fulfilled"),
                        );
                        tracing::debug!(
                            run_id = %state.run_id,
                            node_ref = %child,
                            "action_skipped"
                        );
                        worklist.push_back((child.clone(), skipped));
                    }
                }
            }
        }
        Ok(())
    }

    /// Record `NODE_FAILED` for an action the scheduler failed on the run's
    /// behalf (timeout drain or mid-flight cancellation).
    fn record_cancel_failure(
        &self,
        definition: &WorkflowDefinition,
        run_id: RunId,
        action_ref: &ActionRef,
        reason: &FailureReason,
    ) {
        let node_meta = definition.node_metadata(action_ref);
        self.trace.record(
            run_id,
            DraftEvent::new(
                action_ref.clone(),
                TraceEventType::NodeFailed,
                TraceLevel::Error,
                EventContext::new(node_meta.resolved_stream_id(), node_meta.join_strategy),
            )
            .with_message(reason.message.clone())
            .with_error(reason.clone()),
        );
    }
}

/// Convenience: outputs keyed by plain ref strings, for assertions and
/// display.
#[must_use]
pub fn outputs_by_name(result: &RunResult) -> HashMap<String, Value> {
    result
        .outputs
        .iter()
        .map(|(r, v)| (r.as_str().to_owned(), v.clone()))
        .collect()
}
