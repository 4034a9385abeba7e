//! Engine configuration.

use relay_core::{DEFAULT_MAX_CONCURRENCY, SPILL_THRESHOLD_BYTES};
use serde::{Deserialize, Serialize};

/// Tunables for a scheduler instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Actions a single run may execute simultaneously (default: 10).
    pub max_concurrency: usize,
    /// Serialized outputs above this size are spilled to the object store
    /// (default: 100 KiB).
    pub spill_threshold_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            spill_threshold_bytes: SPILL_THRESHOLD_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.spill_threshold_bytes, 100 * 1024);
    }

    #[test]
    fn serde_roundtrip() {
        let config = EngineConfig {
            max_concurrency: 2,
            spill_threshold_bytes: 1024,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_concurrency, 2);
        assert_eq!(back.spill_threshold_bytes, 1024);
    }
}
