//! Node-I/O events: input/output snapshots per action invocation.

use parking_lot::RwLock;
use relay_core::{
    ActionRef, ComponentId, NODE_IO_SPILL_BYTES, NODE_IO_TRUNCATE_BYTES, RunId, WorkflowId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Terminal status carried on a completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeIoStatus {
    /// The invocation produced an output.
    Completed,
    /// The invocation failed.
    Failed,
}

/// An input or output snapshot of one action invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeIoEvent {
    /// Recorded just before the component executes, with masked inputs.
    #[serde(rename = "NODE_IO_START", rename_all = "camelCase")]
    Start {
        /// The run this snapshot belongs to.
        run_id: RunId,
        /// The action being invoked.
        node_ref: ActionRef,
        /// The workflow id, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workflow_id: Option<WorkflowId>,
        /// The component being invoked, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_id: Option<ComponentId>,
        /// Masked, capped input payload.
        inputs: Value,
    },
    /// Recorded at the invocation's terminal transition, with masked outputs.
    #[serde(rename = "NODE_IO_COMPLETION", rename_all = "camelCase")]
    Completion {
        /// The run this snapshot belongs to.
        run_id: RunId,
        /// The action that finished.
        node_ref: ActionRef,
        /// Masked, capped output payload.
        outputs: Value,
        /// Terminal status.
        status: NodeIoStatus,
        /// Error message when the invocation failed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
}

/// Receives node-I/O events. Best-effort; must not block.
pub trait NodeIoSink: Send + Sync {
    /// Append one event.
    fn append(&self, event: NodeIoEvent);
}

/// In-process sink that retains every event, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemoryNodeIoSink {
    events: RwLock<Vec<NodeIoEvent>>,
}

impl MemoryNodeIoSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<NodeIoEvent> {
        self.events.read().clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether no events have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl NodeIoSink for MemoryNodeIoSink {
    fn append(&self, event: NodeIoEvent) {
        self.events.write().push(event);
    }
}

/// Cap a node-I/O payload to keep event rows bounded.
///
/// Payloads over the spill cap are replaced with a size stub; payloads over
/// the truncation cap (which a driver might otherwise spill by reference)
/// are truncated as a last resort.
#[must_use]
pub fn cap_payload(value: &Value) -> Value {
    let size = serde_json::to_vec(value).map_or(0, |v| v.len());
    if size > NODE_IO_TRUNCATE_BYTES {
        json!({"_truncated": true, "_originalSize": size})
    } else if size > NODE_IO_SPILL_BYTES {
        json!({"_spilled": true, "size": size})
    } else {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn start_event_serializes_with_type_tag() {
        let event = NodeIoEvent::Start {
            run_id: RunId::new(),
            node_ref: ActionRef::new("a"),
            workflow_id: Some(WorkflowId::new("wf")),
            component_id: Some(ComponentId::new("core.console.log")),
            inputs: json!({"data": "hello"}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "NODE_IO_START");
        assert_eq!(json["workflowId"], "wf");
        assert_eq!(json["inputs"]["data"], "hello");

        let back: NodeIoEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn completion_event_carries_status_and_error() {
        let event = NodeIoEvent::Completion {
            run_id: RunId::new(),
            node_ref: ActionRef::new("a"),
            outputs: Value::Null,
            status: NodeIoStatus::Failed,
            error_message: Some("boom".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "NODE_IO_COMPLETION");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["errorMessage"], "boom");
    }

    #[test]
    fn small_payloads_pass_through() {
        let value = json!({"a": 1});
        assert_eq!(cap_payload(&value), value);
    }

    #[test]
    fn oversized_payloads_become_size_stub() {
        let value = json!({"blob": "x".repeat(NODE_IO_SPILL_BYTES + 1)});
        let capped = cap_payload(&value);
        assert_eq!(capped["_spilled"], true);
        assert!(capped["size"].as_u64().unwrap() > NODE_IO_SPILL_BYTES as u64);
    }

    #[test]
    fn huge_payloads_are_truncated() {
        let value = json!({"blob": "x".repeat(NODE_IO_TRUNCATE_BYTES + 1)});
        let capped = cap_payload(&value);
        assert_eq!(capped["_truncated"], true);
        assert!(capped["_originalSize"].as_u64().unwrap() > NODE_IO_TRUNCATE_BYTES as u64);
    }

    #[test]
    fn memory_sink_retains_events() {
        let sink = MemoryNodeIoSink::new();
        assert!(sink.is_empty());
        sink.append(NodeIoEvent::Completion {
            run_id: RunId::new(),
            node_ref: ActionRef::new("a"),
            outputs: json!({}),
            status: NodeIoStatus::Completed,
            error_message: None,
        });
        assert_eq!(sink.len(), 1);
    }
}
