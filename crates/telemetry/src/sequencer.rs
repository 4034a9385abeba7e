//! Per-run trace sequencing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use relay_core::{OrganizationId, RunId, WorkflowId};

use crate::sink::TraceSink;
use crate::trace::{DraftEvent, TraceEvent};

/// Run-level metadata registered before the first event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    /// The workflow being executed.
    pub workflow_id: WorkflowId,
    /// The organization owning the run, if any.
    pub organization_id: Option<OrganizationId>,
}

#[derive(Debug, Default)]
struct RunTraceState {
    next_sequence: u64,
    metadata: Option<RunMetadata>,
}

/// Assigns each trace event its per-run sequence number and dispatches it.
///
/// Sequence numbers are dense and strictly increasing in the order
/// [`record`](Self::record) is invoked; assignment and dispatch happen in one
/// critical section, so events reach the sink in sequence order. The sink may
/// still deliver out of order downstream — `sequence` is the authoritative
/// ordering key.
///
/// [`finalize_run`](Self::finalize_run) drops the counter and metadata; a run
/// id is never reused, so a late event after finalization restarts at 1 and
/// is surfaced with a warning.
pub struct TraceSequencer {
    sink: Arc<dyn TraceSink>,
    runs: Mutex<HashMap<RunId, RunTraceState>>,
}

impl TraceSequencer {
    /// Create a sequencer dispatching to the given sink.
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self {
            sink,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Register run metadata. Must be called before the run's first event.
    pub fn set_run_metadata(&self, run_id: RunId, metadata: RunMetadata) {
        let mut runs = self.runs.lock();
        runs.entry(run_id).or_default().metadata = Some(metadata);
    }

    /// Run metadata, if registered.
    #[must_use]
    pub fn run_metadata(&self, run_id: RunId) -> Option<RunMetadata> {
        self.runs.lock().get(&run_id).and_then(|s| s.metadata.clone())
    }

    /// Stamp the draft with the next sequence number and dispatch it.
    ///
    /// Returns the fully-formed event as recorded.
    pub fn record(&self, run_id: RunId, draft: DraftEvent) -> TraceEvent {
        let mut runs = self.runs.lock();
        let state = runs.entry(run_id).or_default();
        if state.metadata.is_none() {
            tracing::warn!(run_id = %run_id, "trace recorded without run metadata");
        }
        state.next_sequence += 1;
        let event = TraceEvent {
            run_id,
            node_ref: draft.node_ref,
            event_type: draft.event_type,
            timestamp: chrono::Utc::now(),
            level: draft.level,
            message: draft.message,
            data: draft.data,
            output_summary: draft.output_summary,
            error: draft.error,
            context: draft.context,
            sequence: state.next_sequence,
        };
        // Dispatch inside the critical section so the sink observes events in
        // sequence order. Sinks must not block.
        self.sink.append(event.clone());
        event
    }

    /// Drop the run's counter and metadata.
    pub fn finalize_run(&self, run_id: RunId) {
        self.runs.lock().remove(&run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryTraceSink;
    use crate::trace::{EventContext, TraceEventType, TraceLevel};
    use pretty_assertions::assert_eq;
    use relay_core::ActionRef;
    use relay_workflow::JoinStrategy;

    fn draft(node: &str) -> DraftEvent {
        DraftEvent::new(
            ActionRef::new(node),
            TraceEventType::NodeStarted,
            TraceLevel::Info,
            EventContext::new(node, JoinStrategy::All),
        )
    }

    fn sequencer() -> (Arc<MemoryTraceSink>, TraceSequencer) {
        let sink = Arc::new(MemoryTraceSink::new());
        let seq = TraceSequencer::new(sink.clone());
        (sink, seq)
    }

    #[test]
    fn sequences_start_at_one_and_are_dense() {
        let (sink, seq) = sequencer();
        let run = RunId::new();
        seq.set_run_metadata(
            run,
            RunMetadata {
                workflow_id: WorkflowId::new("wf"),
                organization_id: None,
            },
        );

        for i in 1..=5 {
            let event = seq.record(run, draft("a"));
            assert_eq!(event.sequence, i);
        }
        let sequences: Vec<u64> = sink.for_run(run).iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn runs_have_independent_counters() {
        let (_, seq) = sequencer();
        let run_a = RunId::new();
        let run_b = RunId::new();

        assert_eq!(seq.record(run_a, draft("a")).sequence, 1);
        assert_eq!(seq.record(run_a, draft("a")).sequence, 2);
        assert_eq!(seq.record(run_b, draft("b")).sequence, 1);
    }

    #[test]
    fn finalize_clears_counter_and_metadata() {
        let (_, seq) = sequencer();
        let run = RunId::new();
        seq.set_run_metadata(
            run,
            RunMetadata {
                workflow_id: WorkflowId::new("wf"),
                organization_id: None,
            },
        );
        seq.record(run, draft("a"));
        seq.finalize_run(run);

        assert!(seq.run_metadata(run).is_none());
        // A late event restarts the counter rather than continuing it.
        assert_eq!(seq.record(run, draft("a")).sequence, 1);
    }

    #[test]
    fn metadata_is_retrievable() {
        let (_, seq) = sequencer();
        let run = RunId::new();
        let meta = RunMetadata {
            workflow_id: WorkflowId::new("wf-7"),
            organization_id: Some(OrganizationId::new("org")),
        };
        seq.set_run_metadata(run, meta.clone());
        assert_eq!(seq.run_metadata(run), Some(meta));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_recording_stays_dense() {
        let (sink, seq) = sequencer();
        let seq = Arc::new(seq);
        let run = RunId::new();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let seq = seq.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    seq.record(run, draft("n"));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut sequences: Vec<u64> = sink.for_run(run).iter().map(|e| e.sequence).collect();
        sequences.sort_unstable();
        let expected: Vec<u64> = (1..=400).collect();
        assert_eq!(sequences, expected);
    }
}
