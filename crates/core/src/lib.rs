#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Relay Core
//!
//! Core types shared by every other Relay crate.
//!
//! - **Identifiers**: [`RunId`], [`ActionRef`], [`WorkflowId`], [`ComponentId`],
//!   [`OrganizationId`] — newtype wrappers that keep the different id spaces
//!   from mixing.
//! - **Constants**: spill threshold, event payload caps, reserved handle and
//!   key names.
//! - **Failure types**: [`FailureReason`] and [`FailureMetadata`] — the
//!   serializable description of an upstream failure that travels along error
//!   edges.

pub mod constants;
pub mod failure;
pub mod id;

pub use constants::*;
pub use failure::{FailureMetadata, FailureReason};
pub use id::{ActionRef, ComponentId, OrganizationId, RunId, WorkflowId};
