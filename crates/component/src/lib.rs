#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Relay Component
//!
//! The typed function contract every workflow node is bound to.
//!
//! A **component** is a registered, typed function: declared input and output
//! port schemas, optional parameter schema, and an async `execute`. The
//! engine polymorphizes over the fixed [`Component`] capability set — parse
//! inputs, parse outputs, execute, describe ports — rather than a class
//! hierarchy.
//!
//! - [`ConnectionType`] / [`ValuePriority`] / [`PortSpec`] — port metadata
//!   and the value coercion rules.
//! - [`Schema`] — ordered port collection with `parse` validation.
//! - [`Component`] / [`ExecuteArgs`] / [`ComponentOutput`] — the execution
//!   contract, including the awaiting-input sentinel and conditional
//!   routing.
//! - [`ComponentRegistry`] — process-global lookup by component id.
//! - [`mask_secrets`] — schema-driven masking for traces and node-I/O.
//! - [`builtin`] — the platform components the engine itself knows about.

pub mod builtin;
pub mod component;
pub mod error;
pub mod mask;
pub mod ports;
pub mod registry;
pub mod schema;

pub use component::{Component, ComponentOutput, ExecuteArgs, PendingInput};
pub use error::ComponentError;
pub use mask::mask_secrets;
pub use ports::{ConnectionType, PortSpec, ValuePriority};
pub use registry::ComponentRegistry;
pub use schema::Schema;
