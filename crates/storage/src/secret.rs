//! Secret store port and in-memory driver.
//!
//! The store returns cleartext; masking in traces and node-I/O events is the
//! engine's responsibility, not the store's.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StorageError;

/// A resolved secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretValue {
    /// Cleartext secret value.
    pub value: String,
    /// Monotonic version of the stored secret.
    pub version: u64,
}

/// Read-only secret resolution.
///
/// Implementations may cache across a run; the engine never writes.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Resolve a secret by key. Returns `None` when the key is unknown.
    async fn get(&self, key: &str) -> Result<Option<SecretValue>, StorageError>;

    /// List available secret names. Optional; defaults to empty.
    async fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(Vec::new())
    }
}

/// In-process secret store backed by a map.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, SecretValue>>,
}

impl MemorySecretStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a secret, bumping its version.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let mut secrets = self.secrets.write();
        let version = secrets.get(&key).map_or(1, |s| s.version + 1);
        secrets.insert(
            key,
            SecretValue {
                value: value.into(),
                version,
            },
        );
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, key: &str) -> Result<Option<SecretValue>, StorageError> {
        Ok(self.secrets.read().get(key).cloned())
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.secrets.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
