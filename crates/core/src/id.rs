//! Identifier types for Relay entities.
//!
//! All identifiers are newtype wrappers around UUIDs or strings, providing
//! type safety and preventing mixing different id spaces.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one run of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

/// String id of an action, unique within a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionRef(String);

/// Unique identifier for a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(String);

/// Unique identifier for a registered component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(String);

/// Unique identifier for an organization owning a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(String);

impl RunId {
    /// Create a new random run id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a run id from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Create a new id from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert to an owned string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(ActionRef);
string_id!(WorkflowId);
string_id!(ComponentId);
string_id!(OrganizationId);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn run_id_roundtrips_through_uuid() {
        let uuid = Uuid::new_v4();
        let id = RunId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn string_ids_expose_inner_value() {
        let r = ActionRef::new("merge");
        assert_eq!(r.as_str(), "merge");
        assert_eq!(r.to_string(), "merge");
        assert_eq!(r.into_string(), "merge");
    }

    #[test]
    fn string_ids_do_not_compare_across_values() {
        assert_ne!(ActionRef::new("a"), ActionRef::new("b"));
        assert_eq!(WorkflowId::new("wf"), WorkflowId::from("wf"));
    }

    #[test]
    fn action_ref_serializes_as_bare_string() {
        let json = serde_json::to_string(&ActionRef::new("start")).unwrap();
        assert_eq!(json, "\"start\"");
        let back: ActionRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "start");
    }

    #[test]
    fn action_ref_works_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(ActionRef::new("a"), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "{\"a\":1}");
    }
}
