#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Relay Storage
//!
//! Backend interface traits (ports) for payload and secret storage, plus the
//! in-memory drivers the engine's tests run against.
//!
//! - [`ObjectStore`] — key-value blob storage used for spilled payloads and
//!   artifacts; [`MemoryObjectStore`] is the in-process driver.
//! - [`SpillMarker`] — the inline placeholder left behind when an oversized
//!   payload is moved to the object store, with helpers to spill and
//!   materialize values.
//! - [`SecretStore`] — read-only secret resolution; [`MemorySecretStore`] is
//!   the in-process driver.

pub mod error;
pub mod object;
pub mod secret;
pub mod spill;

pub use error::StorageError;
pub use object::{MemoryObjectStore, ObjectStore, StoredObject};
pub use secret::{MemorySecretStore, SecretStore, SecretValue};
pub use spill::{SpillMarker, materialize, spill_value};
