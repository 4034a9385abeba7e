#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Relay Telemetry
//!
//! The observable surface of a run: trace events with a dense per-run
//! sequence, node-I/O events, and structured logs.
//!
//! - [`TraceEvent`] — one row of the execution trace; `sequence` is the
//!   authoritative ordering key.
//! - [`TraceSequencer`] — assigns the per-run sequence under a mutex and
//!   dispatches to a [`TraceSink`].
//! - [`NodeIoEvent`] / [`NodeIoSink`] — input/output snapshots per action,
//!   with payload caps.
//! - [`LogEntry`] / [`LogSink`] / [`LogCollector`] — structured component
//!   logs, split per line with microsecond drift.
//! - In-memory sinks for tests and a broadcast sink for fan-out consumers.
//!
//! Events are projections, **not** the source of truth; sinks are
//! best-effort and must not block.

pub mod log;
pub mod node_io;
pub mod sequencer;
pub mod sink;
pub mod summary;
pub mod trace;

pub use log::{LogCollector, LogEntry, LogSink, LogStream, MemoryLogSink};
pub use node_io::{MemoryNodeIoSink, NodeIoEvent, NodeIoSink, NodeIoStatus, cap_payload};
pub use sequencer::{RunMetadata, TraceSequencer};
pub use sink::{BroadcastTraceSink, MemoryTraceSink, TraceSink};
pub use summary::summarize_output;
pub use trace::{DraftEvent, EventContext, TraceEvent, TraceEventType, TraceLevel};
