//! Spill markers for oversized payloads.
//!
//! Outputs whose serialized size exceeds the spill threshold are moved to the
//! object store and replaced inline with a marker object. Markers travel
//! through the results map like any other JSON value; the resolver tags them
//! with the handle being read and the runner materializes them on demand.

use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::StorageError;
use crate::object::ObjectStore;

/// Marker key identifying a spilled value.
pub const SPILLED_KEY: &str = "__spilled__";
/// Marker key holding the object-store id.
pub const STORAGE_REF_KEY: &str = "storageRef";
/// Marker key holding the pre-spill serialized size.
pub const ORIGINAL_SIZE_KEY: &str = "originalSize";
/// Marker key holding the handle a downstream mapping wants to read.
pub const SPILLED_HANDLE_KEY: &str = "__spilled_handle__";

/// Reserved handle meaning "the whole value" (mirrors `relay_core::SELF_HANDLE`).
const SELF_HANDLE: &str = "__self__";

/// Inline placeholder for a payload that lives in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpillMarker {
    /// Object-store id of the spilled payload.
    pub storage_ref: String,
    /// Serialized size of the original payload in bytes.
    pub original_size: u64,
    /// Handle a downstream mapping wants extracted, if the marker was tagged
    /// by the resolver.
    pub handle: Option<String>,
}

impl SpillMarker {
    /// Create an untagged marker.
    pub fn new(storage_ref: impl Into<String>, original_size: u64) -> Self {
        Self {
            storage_ref: storage_ref.into(),
            original_size,
            handle: None,
        }
    }

    /// Tag the marker with the handle a downstream input wants.
    #[must_use]
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Encode the marker into its inline JSON form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            SPILLED_KEY: true,
            STORAGE_REF_KEY: self.storage_ref,
            ORIGINAL_SIZE_KEY: self.original_size,
        });
        if let Some(handle) = &self.handle {
            value[SPILLED_HANDLE_KEY] = Value::String(handle.clone());
        }
        value
    }

    /// Decode a marker from its inline JSON form, if the value is one.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.get(SPILLED_KEY)?.as_bool() != Some(true) {
            return None;
        }
        Some(Self {
            storage_ref: object.get(STORAGE_REF_KEY)?.as_str()?.to_owned(),
            original_size: object.get(ORIGINAL_SIZE_KEY).and_then(Value::as_u64)?,
            handle: object
                .get(SPILLED_HANDLE_KEY)
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }

    /// Whether a JSON value is a spill marker.
    #[must_use]
    pub fn is_marker(value: &Value) -> bool {
        value
            .as_object()
            .and_then(|o| o.get(SPILLED_KEY))
            .and_then(Value::as_bool)
            == Some(true)
    }
}

/// Upload a value to the store under a fresh id and return its marker.
pub async fn spill_value(
    store: &dyn ObjectStore,
    value: &Value,
) -> Result<SpillMarker, StorageError> {
    let bytes = serde_json::to_vec(value)?;
    let size = bytes.len() as u64;
    let id = Uuid::new_v4().to_string();
    store
        .upload(&id, "spilled-output.json", bytes, "application/json")
        .await?;
    Ok(SpillMarker::new(id, size))
}

/// Download a spilled payload and extract the marker's handle.
///
/// A handle of `None` or `"__self__"` yields the whole payload; any other
/// handle indexes into the payload object (`Value::Null` when absent).
pub async fn materialize(
    store: &dyn ObjectStore,
    marker: &SpillMarker,
) -> Result<Value, StorageError> {
    let object = store.download(&marker.storage_ref).await?;
    let payload: Value = serde_json::from_slice(&object.bytes)?;
    match marker.handle.as_deref() {
        None | Some(SELF_HANDLE) => Ok(payload),
        Some(handle) => Ok(payload.get(handle).cloned().unwrap_or(Value::Null)),
    }
}
