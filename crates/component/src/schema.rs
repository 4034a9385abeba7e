//! Port schemas and payload validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ComponentError;
use crate::ports::PortSpec;

/// An ordered collection of declared ports.
///
/// A schema with no declared ports is a passthrough: `parse` accepts any
/// value unchanged. A schema may be marked wholly secret, in which case the
/// entire payload is masked in observable surfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    ports: Vec<PortSpec>,
    #[serde(default)]
    secret: bool,
}

impl Schema {
    /// A schema with the given ports.
    #[must_use]
    pub fn new(ports: Vec<PortSpec>) -> Self {
        Self {
            ports,
            secret: false,
        }
    }

    /// A schema accepting any value unchanged.
    #[must_use]
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Mark the whole payload as secret.
    #[must_use]
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Whether the whole payload is secret.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// The declared ports, in declaration order.
    #[must_use]
    pub fn ports(&self) -> &[PortSpec] {
        &self.ports
    }

    /// Look up a port by id.
    #[must_use]
    pub fn port(&self, id: &str) -> Option<&PortSpec> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Validate and coerce a payload against this schema.
    ///
    /// Required ports must be present and non-null; declared ports coerce to
    /// their connection type; undeclared keys pass through unchanged. Any
    /// violation is a non-retryable validation error whose `field_errors`
    /// enumerate every offending port.
    pub fn parse(&self, value: &Value) -> Result<Value, ComponentError> {
        if self.ports.is_empty() {
            return Ok(value.clone());
        }

        let empty = serde_json::Map::new();
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Null => &empty,
            other => {
                return Err(ComponentError::validation(
                    format!("expected an object payload, got {other}"),
                    Vec::new(),
                ));
            }
        };

        let mut parsed = fields.clone();
        let mut field_errors = Vec::new();

        for port in &self.ports {
            match fields.get(&port.id) {
                None | Some(Value::Null) => {
                    if port.required {
                        field_errors.push(format!("Input '{}' is required", port.id));
                    }
                }
                Some(present) => match port.connection_type.coerce(present) {
                    Ok(coerced) => {
                        parsed.insert(port.id.clone(), coerced);
                    }
                    Err(err) => {
                        field_errors.push(format!("Input '{}': {err}", port.id));
                    }
                },
            }
        }

        if field_errors.is_empty() {
            Ok(Value::Object(parsed))
        } else {
            Err(ComponentError::validation(
                field_errors.join("; "),
                field_errors,
            ))
        }
    }
}
