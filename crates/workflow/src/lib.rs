#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Relay Workflow
//!
//! The workflow definition model: an immutable snapshot of a DAG of actions
//! plus the structural queries the scheduler needs.
//!
//! - [`WorkflowDefinition`] — versioned snapshot (actions, edges, node
//!   metadata, dependency counts, config); parses the platform's JSON wire
//!   format directly.
//! - [`ActionDefinition`] — one node: component binding, design-time params
//!   and input overrides, dependencies, port-level input mappings.
//! - [`Edge`] / [`EdgeKind`] — directed relations that fire on success or on
//!   failure of their source.
//! - [`NodeMetadata`] / [`JoinStrategy`] — fan-in rules and trace grouping.
//! - [`DependencyGraph`] — adjacency queries with structural validation
//!   (dangling refs, undeclared mapping sources, cycles).

pub mod definition;
pub mod error;
pub mod graph;

pub use definition::{
    ActionDefinition, Edge, EdgeKind, Entrypoint, InputMapping, JoinStrategy, NodeMetadata,
    RetryPolicy, WorkflowConfig, WorkflowDefinition,
};
pub use error::WorkflowError;
pub use graph::DependencyGraph;
