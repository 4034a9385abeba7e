//! Structured component logs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use relay_core::{ActionRef, RunId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::trace::TraceLevel;

/// Which stream a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    /// Subprocess standard output.
    Stdout,
    /// Subprocess standard error.
    Stderr,
    /// Component console logging.
    Console,
}

/// One structured log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// The run this line belongs to.
    pub run_id: RunId,
    /// The action that produced it.
    pub node_ref: ActionRef,
    /// Source stream.
    pub stream: LogStream,
    /// Severity.
    pub level: TraceLevel,
    /// Single line of text (multi-line messages are split before emission).
    pub message: String,
    /// When the line was produced.
    pub timestamp: DateTime<Utc>,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Receives log entries. Best-effort; must not block.
pub trait LogSink: Send + Sync {
    /// Append one entry.
    fn append(&self, entry: LogEntry);
}

/// In-process sink that retains every entry, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryLogSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries recorded so far, in arrival order.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().clone()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no entries have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, entry: LogEntry) {
        self.entries.write().push(entry);
    }
}

/// Per-action log handle handed to components through the execution context.
///
/// Splits multi-line messages on CR/LF and re-timestamps each line with a
/// microsecond drift so consumers ordering by timestamp preserve line order.
#[derive(Clone)]
pub struct LogCollector {
    run_id: RunId,
    node_ref: ActionRef,
    sink: Arc<dyn LogSink>,
}

impl LogCollector {
    /// Create a collector for one action.
    pub fn new(run_id: RunId, node_ref: ActionRef, sink: Arc<dyn LogSink>) -> Self {
        Self {
            run_id,
            node_ref,
            sink,
        }
    }

    /// Emit a message, one entry per line.
    pub fn log(&self, stream: LogStream, level: TraceLevel, message: &str) {
        let base = Utc::now();
        let normalized = message.replace("\r\n", "\n");
        for (index, line) in normalized.split(['\n', '\r']).enumerate() {
            let timestamp = base + Duration::microseconds(index as i64);
            self.sink.append(LogEntry {
                run_id: self.run_id,
                node_ref: self.node_ref.clone(),
                stream,
                level,
                message: line.to_owned(),
                timestamp,
                metadata: None,
            });
        }
    }

    /// Emit an info-level console message.
    pub fn info(&self, message: &str) {
        self.log(LogStream::Console, TraceLevel::Info, message);
    }

    /// Emit an error-level console message.
    pub fn error(&self, message: &str) {
        self.log(LogStream::Console, TraceLevel::Error, message);
    }
}

impl std::fmt::Debug for LogCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogCollector")
            .field("run_id", &self.run_id)
            .field("node_ref", &self.node_ref)
            .finish_non_exhaustive()
    }
}
