//! Object store port and in-memory driver.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StorageError;

/// A stored blob with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// The raw bytes.
    pub bytes: Vec<u8>,
    /// Original file name.
    pub name: String,
    /// MIME type of the content.
    pub mime: String,
}

/// Key-value blob storage.
///
/// Spilled payloads are content-addressed by a fresh id per spill, so two
/// uploads never collide. Implementations must be `Send + Sync` so the trait
/// object can be shared across Tokio tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a blob under the given id.
    async fn upload(
        &self,
        id: &str,
        name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<(), StorageError>;

    /// Retrieve a blob and its metadata by id.
    async fn download(&self, id: &str) -> Result<StoredObject, StorageError>;
}

/// In-process object store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Ids of all stored objects.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        id: &str,
        name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<(), StorageError> {
        self.objects.write().insert(
            id.to_owned(),
            StoredObject {
                bytes,
                name: name.to_owned(),
                mime: mime.to_owned(),
            },
        );
        Ok(())
    }

    async fn download(&self, id: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn upload_and_download() {
        let store = MemoryObjectStore::new();
        store
            .upload("id-1", "payload.json", b"{\"a\":1}".to_vec(), "application/json")
            .await
            .unwrap();

        let object = store.download("id-1").await.unwrap();
        assert_eq!(object.bytes, b"{\"a\":1}");
        assert_eq!(object.name, "payload.json");
        assert_eq!(object.mime, "application/json");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn download_missing_is_not_found() {
        let store = MemoryObjectStore::new();
        let err = store.download("ghost").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn upload_overwrites_same_id() {
        let store = MemoryObjectStore::new();
        store
            .upload("id", "a", b"one".to_vec(), "text/plain")
            .await
            .unwrap();
        store
            .upload("id", "b", b"two".to_vec(), "text/plain")
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.download("id").await.unwrap().bytes, b"two");
    }
}
