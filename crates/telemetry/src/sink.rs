//! Trace sinks.
//!
//! A sink receives fully-sequenced [`TraceEvent`]s. Delivery is best-effort
//! and must not block: asynchronous backends (a message bus, a database
//! writer) buffer internally and drain on their own schedule, while
//! `sequence` remains the authoritative ordering key for consumers.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use relay_core::RunId;
use tokio::sync::broadcast;

use crate::trace::TraceEvent;

/// Receives sequenced trace events.
pub trait TraceSink: Send + Sync {
    /// Append one event. Must not block.
    fn append(&self, event: TraceEvent);
}

/// In-process sink that retains every event, for tests and inspection.
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    events: RwLock<Vec<TraceEvent>>,
}

impl MemoryTraceSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.read().clone()
    }

    /// Events for one run, ordered by sequence.
    #[must_use]
    pub fn for_run(&self, run_id: RunId) -> Vec<TraceEvent> {
        let mut events: Vec<TraceEvent> = self
            .events
            .read()
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sequence);
        events
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

impl TraceSink for MemoryTraceSink {
    fn append(&self, event: TraceEvent) {
        self.events.write().push(event);
    }
}

/// Broadcast-based sink fanning events out to subscribers.
///
/// Delivers each event to all active subscribers. With no subscribers, or
/// when a subscriber lags past the channel capacity, events are dropped —
/// they are projections, not the source of truth.
pub struct BroadcastTraceSink {
    sender: broadcast::Sender<TraceEvent>,
    emitted: AtomicU64,
}

impl BroadcastTraceSink {
    /// Create a sink with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            emitted: AtomicU64::new(0),
        }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> broadcast::Receiver<TraceEvent> {
        self.sender.subscribe()
    }

    /// Total events emitted since creation.
    #[must_use]
    pub fn total_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl TraceSink for BroadcastTraceSink {
    fn append(&self, event: TraceEvent) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        // Ignore send error (no active receivers).
        let _ = self.sender.send(event);
    }
}
