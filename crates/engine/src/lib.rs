#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Relay Engine
//!
//! The workflow scheduler core: drives one run of a DAG of component
//! invocations to completion.
//!
//! - [`Scheduler`] — indegree-driven executor with bounded concurrency,
//!   deterministic joins, error-edge routing, skip cascades, deadlock
//!   detection, and run timeout.
//! - [`ActionRunner`] — one component invocation end to end: resolve,
//!   materialize spills, parse, execute, spill, record.
//! - [`resolver`] — pure input resolution from upstream outputs.
//! - [`routing`] — pure edge settlement and join evaluation.
//! - [`InputGateway`] — the single seam where external human input enters.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use relay_component::{ComponentRegistry, builtin::register_builtins};
//! use relay_engine::{RunRequest, Scheduler};
//! use relay_storage::MemoryObjectStore;
//! use relay_telemetry::{MemoryLogSink, MemoryNodeIoSink, MemoryTraceSink, TraceSequencer};
//! use relay_workflow::WorkflowDefinition;
//!
//! let registry = Arc::new(ComponentRegistry::new());
//! register_builtins(&registry);
//! let scheduler = Scheduler::new(
//!     registry,
//!     Arc::new(TraceSequencer::new(Arc::new(MemoryTraceSink::new()))),
//!     Arc::new(MemoryNodeIoSink::new()),
//!     Arc::new(MemoryLogSink::new()),
//!     Arc::new(MemoryObjectStore::new()),
//! );
//!
//! let definition: WorkflowDefinition = serde_json::from_str("…")?;
//! let request = RunRequest::new("demo".into(), Arc::new(definition));
//! let result = scheduler.execute(request).await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod resolver;
pub mod routing;
pub mod run;
pub mod runner;
pub mod scheduler;

pub use config::EngineConfig;
pub use error::EngineError;
pub use gateway::{AutoApproveGateway, InputGateway, InputResolution, UnconfiguredGateway};
pub use resolver::{ManualOverride, ResolveWarning, ResolvedPayload, build_action_payload};
pub use routing::{JoinDecision, evaluate_join, settle_edges};
pub use run::{RunRequest, RunResult};
pub use runner::{ActionJob, ActionRunner, CompletedAction, LaunchContext};
pub use scheduler::{Scheduler, outputs_by_name};
