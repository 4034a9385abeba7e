//! Workflow definition types.
//!
//! A definition is an immutable snapshot produced by the workflow compiler.
//! It is shared (behind an `Arc`) across every run that executes it; nothing
//! here is mutated at run time.

use std::collections::HashMap;

use relay_core::{ActionRef, ComponentId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fan-in rule for a node with multiple parents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Wait for every parent edge to settle; any hard failure skips the node.
    #[default]
    All,
    /// Fire as soon as one parent satisfies; later completions are ignored.
    Any,
    /// Like `any`, but the first parent to settle decides: an unsatisfied
    /// first settler skips the node for good.
    First,
}

impl std::fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
            Self::First => write!(f, "first"),
        }
    }
}

/// Whether an edge fires when its source completes or when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Fires on successful completion of the source.
    Success,
    /// Fires when the source fails; carries the failure metadata downstream.
    Error,
}

/// A directed relation between two actions.
///
/// More than one edge may connect the same pair of refs (for example a
/// success edge and an error edge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique edge id within the definition.
    pub id: String,
    /// The parent action.
    pub source_ref: ActionRef,
    /// The child action.
    pub target_ref: ActionRef,
    /// Output port on the source this edge is attached to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Input port on the target this edge is attached to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Success or error edge.
    pub kind: EdgeKind,
}

/// Per-node scheduling and trace-grouping metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// The action this metadata belongs to.
    #[serde(rename = "ref")]
    pub action_ref: ActionRef,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Fan-in rule; defaults to [`JoinStrategy::All`].
    #[serde(default)]
    pub join_strategy: JoinStrategy,
    /// Advisory per-node concurrency hint. The scheduler enforces only the
    /// global cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Group id used as a stream-id fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Logical stream for correlating trace and log events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

impl NodeMetadata {
    /// Metadata with defaults for a ref that has no explicit node entry.
    #[must_use]
    pub fn default_for(action_ref: ActionRef) -> Self {
        Self {
            action_ref,
            label: None,
            join_strategy: JoinStrategy::default(),
            max_concurrency: None,
            group_id: None,
            stream_id: None,
        }
    }

    /// The stream id for this node: explicit stream, else group, else ref.
    #[must_use]
    pub fn resolved_stream_id(&self) -> String {
        self.stream_id
            .clone()
            .or_else(|| self.group_id.clone())
            .unwrap_or_else(|| self.action_ref.as_str().to_owned())
    }
}

/// A port-level binding: which upstream output feeds an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMapping {
    /// The upstream action producing the value.
    pub source_ref: ActionRef,
    /// Output handle on the source; `"__self__"` means the whole output.
    pub source_handle: String,
}

/// Retry declaration carried on an action for the outer durable harness.
///
/// The scheduler itself never retries; it surfaces this policy alongside
/// retryable failures so the harness can act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base backoff between attempts, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_seconds: Option<u64>,
}

/// One node of the DAG: a component binding plus its wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    /// Unique ref of this action within the definition.
    #[serde(rename = "ref")]
    pub action_ref: ActionRef,
    /// The component this action invokes.
    pub component_id: ComponentId,
    /// Design-time configuration values.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Design-time constants for input ports.
    #[serde(default)]
    pub input_overrides: Map<String, Value>,
    /// Parents this action waits on.
    #[serde(default)]
    pub depends_on: Vec<ActionRef>,
    /// Port-level bindings: target port → upstream (ref, handle).
    #[serde(default)]
    pub input_mappings: HashMap<String, InputMapping>,
    /// Retry declaration for the outer harness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
}

/// Designates the entry action of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrypoint {
    /// Ref of the entry action.
    #[serde(rename = "ref")]
    pub action_ref: ActionRef,
}

/// Run-level configuration embedded in the definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    /// Environment name this definition was compiled for.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Wall-clock bound on the whole run, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

fn default_environment() -> String {
    "default".to_owned()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            timeout_seconds: None,
        }
    }
}

/// An immutable workflow snapshot, shared across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Definition version tag.
    pub version: u32,
    /// Workflow title.
    pub title: String,
    /// The entry action.
    pub entrypoint: Entrypoint,
    /// Per-node metadata, keyed by ref. Refs without an entry get defaults.
    #[serde(default)]
    pub nodes: HashMap<ActionRef, NodeMetadata>,
    /// Ordered edge list.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Pre-computed indegree per ref; falls back to `depends_on` length.
    #[serde(default)]
    pub dependency_counts: HashMap<ActionRef, usize>,
    /// Ordered action list.
    pub actions: Vec<ActionDefinition>,
    /// Run-level configuration.
    #[serde(default)]
    pub config: WorkflowConfig,
}

impl WorkflowDefinition {
    /// Look up an action by ref.
    #[must_use]
    pub fn action(&self, action_ref: &ActionRef) -> Option<&ActionDefinition> {
        self.actions.iter().find(|a| &a.action_ref == action_ref)
    }

    /// Node metadata for a ref, falling back to defaults.
    #[must_use]
    pub fn node_metadata(&self, action_ref: &ActionRef) -> NodeMetadata {
        self.nodes
            .get(action_ref)
            .cloned()
            .unwrap_or_else(|| NodeMetadata::default_for(action_ref.clone()))
    }

    /// The indegree the scheduler waits on for a ref.
    ///
    /// Uses the pre-computed count when present, otherwise the number of
    /// declared dependencies.
    #[must_use]
    pub fn indegree(&self, action_ref: &ActionRef) -> usize {
        self.dependency_counts
            .get(action_ref)
            .copied()
            .or_else(|| self.action(action_ref).map(|a| a.depends_on.len()))
            .unwrap_or(0)
    }

    /// All edges leaving a ref, in definition order.
    pub fn outgoing_edges<'a>(
        &'a self,
        action_ref: &'a ActionRef,
    ) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.source_ref == action_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// The minimal definition from the platform's wire-format documentation.
    const MINIMAL: &str = r#"{
      "version": 1, "title": "demo", "entrypoint": {"ref":"start"},
      "nodes": {"start":{"ref":"start"},"a":{"ref":"a","joinStrategy":"all"}},
      "edges": [{"id":"e1","sourceRef":"start","targetRef":"a","kind":"success"}],
      "dependencyCounts": {"start":0,"a":1},
      "actions": [
       {"ref":"start","componentId":"core.workflow.entrypoint","params":{},"inputOverrides":{},"dependsOn":[],"inputMappings":{}},
       {"ref":"a","componentId":"core.console.log","params":{},"inputOverrides":{"data":"hello"},"dependsOn":["start"],"inputMappings":{}}
      ],
      "config": {"environment":"test","timeoutSeconds":30}
    }"#;

    #[test]
    fn parses_the_documented_minimal_definition() {
        let def: WorkflowDefinition = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(def.version, 1);
        assert_eq!(def.title, "demo");
        assert_eq!(def.entrypoint.action_ref.as_str(), "start");
        assert_eq!(def.actions.len(), 2);
        assert_eq!(def.edges.len(), 1);
        assert_eq!(def.edges[0].kind, EdgeKind::Success);
        assert_eq!(def.config.environment, "test");
        assert_eq!(def.config.timeout_seconds, Some(30));
    }

    #[test]
    fn indegree_prefers_dependency_counts() {
        let def: WorkflowDefinition = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(def.indegree(&ActionRef::new("start")), 0);
        assert_eq!(def.indegree(&ActionRef::new("a")), 1);
    }

    #[test]
    fn indegree_falls_back_to_depends_on() {
        let mut def: WorkflowDefinition = serde_json::from_str(MINIMAL).unwrap();
        def.dependency_counts.clear();
        assert_eq!(def.indegree(&ActionRef::new("a")), 1);
        assert_eq!(def.indegree(&ActionRef::new("missing")), 0);
    }

    #[test]
    fn action_lookup_by_ref() {
        let def: WorkflowDefinition = serde_json::from_str(MINIMAL).unwrap();
        let a = def.action(&ActionRef::new("a")).unwrap();
        assert_eq!(a.component_id.as_str(), "core.console.log");
        assert_eq!(a.input_overrides["data"], "hello");
        assert!(def.action(&ActionRef::new("nope")).is_none());
    }

    #[test]
    fn node_metadata_defaults_for_unknown_ref() {
        let def: WorkflowDefinition = serde_json::from_str(MINIMAL).unwrap();
        let meta = def.node_metadata(&ActionRef::new("ghost"));
        assert_eq!(meta.join_strategy, JoinStrategy::All);
        assert_eq!(meta.resolved_stream_id(), "ghost");
    }

    #[test]
    fn stream_id_falls_back_through_group_to_ref() {
        let mut meta = NodeMetadata::default_for(ActionRef::new("n"));
        assert_eq!(meta.resolved_stream_id(), "n");

        meta.group_id = Some("batch".into());
        assert_eq!(meta.resolved_stream_id(), "batch");

        meta.stream_id = Some("explicit".into());
        assert_eq!(meta.resolved_stream_id(), "explicit");
    }

    #[test]
    fn join_strategy_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JoinStrategy::Any).unwrap(), "\"any\"");
        let back: JoinStrategy = serde_json::from_str("\"first\"").unwrap();
        assert_eq!(back, JoinStrategy::First);
    }

    #[test]
    fn outgoing_edges_filters_by_source() {
        let def: WorkflowDefinition = serde_json::from_str(MINIMAL).unwrap();
        let start_ref = ActionRef::new("start");
        let out: Vec<_> = def.outgoing_edges(&start_ref).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target_ref.as_str(), "a");
        assert_eq!(def.outgoing_edges(&ActionRef::new("a")).count(), 0);
    }

    #[test]
    fn definition_roundtrips_through_json() {
        let def: WorkflowDefinition = serde_json::from_str(MINIMAL).unwrap();
        let json = serde_json::to_string(&def).unwrap();
        let back: WorkflowDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
    }
}
