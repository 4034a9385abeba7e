//! Constants and configuration defaults for the Relay workflow engine.

/// Serialized outputs larger than this are spilled to the object store and
/// replaced with an inline marker (see `relay-storage`).
pub const SPILL_THRESHOLD_BYTES: usize = 100 * 1024;

/// Node-I/O event payloads larger than this are replaced with a size stub.
pub const NODE_IO_SPILL_BYTES: usize = 100 * 1024;

/// Last-resort cap on a single node-I/O event; anything larger is truncated.
pub const NODE_IO_TRUNCATE_BYTES: usize = 900 * 1024;

/// Default number of actions a single run may execute simultaneously.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Reserved source handle meaning "the whole upstream output".
pub const SELF_HANDLE: &str = "__self__";

/// Reserved input key under which runtime inputs reach the entrypoint action.
pub const RUNTIME_DATA_KEY: &str = "__runtimeData";

/// Component id of the workflow entrypoint marker.
pub const ENTRYPOINT_COMPONENT: &str = "core.workflow.entrypoint";

/// Replacement literal for secret values in traces and node-I/O events.
pub const SECRET_MASK: &str = "***";
