//! Trace event types.

use chrono::{DateTime, Utc};
use relay_core::{ActionRef, FailureMetadata, FailureReason, RunId};
use relay_workflow::JoinStrategy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceEventType {
    /// An action began executing.
    NodeStarted,
    /// Intermediate progress (resolver overrides, warnings, component progress).
    NodeProgress,
    /// An action completed successfully.
    NodeCompleted,
    /// An action failed.
    NodeFailed,
    /// An action was skipped because no incoming edge was fulfilled.
    NodeSkipped,
    /// An action is suspended waiting on an external input resolution.
    AwaitingInput,
}

/// Severity of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal progress.
    Info,
    /// Something unexpected but recoverable.
    Warn,
    /// A failure.
    Error,
}

/// Scheduling context attached to every trace event of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    /// Logical stream grouping related activities.
    pub stream_id: String,
    /// The node's fan-in rule.
    pub join_strategy: JoinStrategy,
    /// The parent whose completion made this node ready, for any/first joins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<ActionRef>,
    /// Upstream failure metadata when this node was reached via an error edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureMetadata>,
}

impl EventContext {
    /// Context for a root node of a stream.
    pub fn new(stream_id: impl Into<String>, join_strategy: JoinStrategy) -> Self {
        Self {
            stream_id: stream_id.into(),
            join_strategy,
            triggered_by: None,
            failure: None,
        }
    }

    /// Set the triggering parent.
    #[must_use]
    pub fn with_triggered_by(mut self, triggered_by: Option<ActionRef>) -> Self {
        self.triggered_by = triggered_by;
        self
    }

    /// Set the upstream failure.
    #[must_use]
    pub fn with_failure(mut self, failure: Option<FailureMetadata>) -> Self {
        self.failure = failure;
        self
    }
}

/// A trace event before the sequencer stamps run id, timestamp, and sequence.
#[derive(Debug, Clone)]
pub struct DraftEvent {
    /// The action this event belongs to.
    pub node_ref: ActionRef,
    /// Event kind.
    pub event_type: TraceEventType,
    /// Severity.
    pub level: TraceLevel,
    /// Human-readable message.
    pub message: Option<String>,
    /// Structured payload.
    pub data: Option<Value>,
    /// Lightweight output summary for completion events.
    pub output_summary: Option<Value>,
    /// Error payload for failure events.
    pub error: Option<FailureReason>,
    /// Scheduling context.
    pub context: EventContext,
}

impl DraftEvent {
    /// Create a draft with no message or payload.
    pub fn new(
        node_ref: ActionRef,
        event_type: TraceEventType,
        level: TraceLevel,
        context: EventContext,
    ) -> Self {
        Self {
            node_ref,
            event_type,
            level,
            message: None,
            data: None,
            output_summary: None,
            error: None,
            context,
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a structured payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach an output summary.
    #[must_use]
    pub fn with_summary(mut self, summary: Value) -> Self {
        self.output_summary = Some(summary);
        self
    }

    /// Attach an error payload.
    #[must_use]
    pub fn with_error(mut self, error: FailureReason) -> Self {
        self.error = Some(error);
        self
    }
}

/// One row of the execution trace.
///
/// `sequence` is dense and strictly increasing per run, in the order events
/// were recorded. Consumers order by `(runId, sequence)`; delivery order is
/// not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    /// The run this event belongs to.
    pub run_id: RunId,
    /// The action this event belongs to.
    pub node_ref: ActionRef,
    /// Event kind.
    #[serde(rename = "type")]
    pub event_type: TraceEventType,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: TraceLevel,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Lightweight output summary for completion events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_summary: Option<Value>,
    /// Error payload for failure events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureReason>,
    /// Scheduling context.
    pub context: EventContext,
    /// Per-run monotonic sequence number, starting at 1.
    pub sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn event_type_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&TraceEventType::NodeStarted).unwrap(),
            "\"NODE_STARTED\""
        );
        assert_eq!(
            serde_json::to_string(&TraceEventType::AwaitingInput).unwrap(),
            "\"AWAITING_INPUT\""
        );
    }

    #[test]
    fn level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TraceLevel::Warn).unwrap(), "\"warn\"");
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(TraceLevel::Debug < TraceLevel::Info);
        assert!(TraceLevel::Warn < TraceLevel::Error);
    }

    #[test]
    fn draft_builders_compose() {
        let draft = DraftEvent::new(
            ActionRef::new("a"),
            TraceEventType::NodeProgress,
            TraceLevel::Warn,
            EventContext::new("s1", JoinStrategy::All),
        )
        .with_message("input 'label' unresolved")
        .with_data(serde_json::json!({"target": "label"}));

        assert_eq!(draft.message.as_deref(), Some("input 'label' unresolved"));
        assert_eq!(draft.data.unwrap()["target"], "label");
        assert!(draft.error.is_none());
    }

    #[test]
    fn event_roundtrips_with_type_key() {
        let event = TraceEvent {
            run_id: RunId::new(),
            node_ref: ActionRef::new("a"),
            event_type: TraceEventType::NodeCompleted,
            timestamp: Utc::now(),
            level: TraceLevel::Info,
            message: None,
            data: None,
            output_summary: Some(serde_json::json!({"_truncated": true})),
            error: None,
            context: EventContext::new("s1", JoinStrategy::Any)
                .with_triggered_by(Some(ActionRef::new("fast"))),
            sequence: 7,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "NODE_COMPLETED");
        assert_eq!(json["context"]["triggeredBy"], "fast");
        assert_eq!(json["sequence"], 7);

        let back: TraceEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
