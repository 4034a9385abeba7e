//! Run request and result types.

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::{ActionRef, OrganizationId, RunId, WorkflowId};
use relay_workflow::WorkflowDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to execute one run of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Unique id for this run.
    pub run_id: RunId,
    /// The workflow being executed.
    pub workflow_id: WorkflowId,
    /// The immutable definition snapshot to execute.
    pub definition: Arc<WorkflowDefinition>,
    /// Runtime inputs injected at the entrypoint.
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// The organization owning the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    /// Version tag of the definition, when the caller tracks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_version_id: Option<String>,
    /// The run that spawned this one, for sub-workflow invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<RunId>,
    /// The node in the parent run that spawned this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_ref: Option<ActionRef>,
    /// Sub-workflow nesting depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Workflow ids on the invocation path, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_chain: Vec<WorkflowId>,
}

impl RunRequest {
    /// A request with a fresh run id and no runtime inputs.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, definition: Arc<WorkflowDefinition>) -> Self {
        Self {
            run_id: RunId::new(),
            workflow_id,
            definition,
            inputs: Map::new(),
            organization_id: None,
            workflow_version_id: None,
            parent_run_id: None,
            parent_node_ref: None,
            depth: None,
            call_chain: Vec::new(),
        }
    }

    /// Set the runtime inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the owning organization.
    #[must_use]
    pub fn with_organization(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}

/// The terminal result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Output of every action that produced one, keyed by ref.
    pub outputs: HashMap<ActionRef, Value>,
    /// Whether the run finished without hard or soft failures.
    pub success: bool,
    /// Aggregated `"[ref] message"` failure descriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
