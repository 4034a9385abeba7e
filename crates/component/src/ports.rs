//! Port metadata and value coercion.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A value could not be coerced to a port's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, got {found}")]
pub struct CoercionError {
    /// The declared type.
    pub expected: String,
    /// What the value actually was.
    pub found: String,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The declared shape of a port.
///
/// Primitives coerce cross-type-compatible values; `list` and `map` coerce
/// element-wise; a `contract` names an externally-defined schema and passes
/// values through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionType {
    /// UTF-8 text; accepts numbers and booleans stringified.
    Text,
    /// Numeric; accepts unambiguous numeric strings.
    Number,
    /// Boolean; accepts the strings `"true"` and `"false"`.
    Boolean,
    /// A file reference; passes through.
    File,
    /// Arbitrary JSON; passes through.
    Json,
    /// A secret; accepts strings and JSON-serializable values, masked in
    /// every observable surface.
    Secret,
    /// Anything; passes through.
    Any,
    /// Homogeneous list, coerced element-wise.
    List {
        /// Element type.
        item: Box<ConnectionType>,
    },
    /// String-keyed map, values coerced element-wise.
    Map {
        /// Value type.
        value: Box<ConnectionType>,
    },
    /// A named schema defined elsewhere; passes through.
    Contract {
        /// Contract name; names containing `credential` classify as secret.
        name: String,
    },
}

impl ConnectionType {
    /// Whether values of this type must be masked in traces and node-I/O.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        match self {
            Self::Secret => true,
            Self::Contract { name } => name.to_ascii_lowercase().contains("credential"),
            _ => false,
        }
    }

    /// Coerce a value to this type.
    pub fn coerce(&self, value: &Value) -> Result<Value, CoercionError> {
        match self {
            Self::Text => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(CoercionError {
                    expected: "text".into(),
                    found: kind_of(other).into(),
                }),
            },
            Self::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => {
                    let trimmed = s.trim();
                    if let Ok(n) = trimmed.parse::<i64>() {
                        Ok(Value::Number(n.into()))
                    } else if let Some(n) = trimmed
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                    {
                        Ok(Value::Number(n))
                    } else {
                        Err(CoercionError {
                            expected: "number".into(),
                            found: format!("string \"{s}\""),
                        })
                    }
                }
                other => Err(CoercionError {
                    expected: "number".into(),
                    found: kind_of(other).into(),
                }),
            },
            Self::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => match s.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(CoercionError {
                        expected: "boolean".into(),
                        found: format!("string \"{s}\""),
                    }),
                },
                other => Err(CoercionError {
                    expected: "boolean".into(),
                    found: kind_of(other).into(),
                }),
            },
            Self::File | Self::Json | Self::Secret | Self::Any | Self::Contract { .. } => {
                Ok(value.clone())
            }
            Self::List { item } => match value {
                Value::Array(items) => {
                    let coerced: Result<Vec<Value>, CoercionError> =
                        items.iter().map(|v| item.coerce(v)).collect();
                    Ok(Value::Array(coerced?))
                }
                other => Err(CoercionError {
                    expected: "list".into(),
                    found: kind_of(other).into(),
                }),
            },
            Self::Map { value: value_type } => match value {
                Value::Object(entries) => {
                    let mut coerced = serde_json::Map::new();
                    for (key, entry) in entries {
                        coerced.insert(key.clone(), value_type.coerce(entry)?);
                    }
                    Ok(Value::Object(coerced))
                }
                other => Err(CoercionError {
                    expected: "map".into(),
                    found: kind_of(other).into(),
                }),
            },
        }
    }
}

/// Which source wins when an input port has both a manual value and a
/// connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValuePriority {
    /// A defined manual override beats the connected value.
    ManualFirst,
    /// The connected value overwrites any manual override.
    #[default]
    ConnectionFirst,
}

/// A declared input or output port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    /// Port id, unique within the schema.
    pub id: String,
    /// Declared value shape.
    pub connection_type: ConnectionType,
    /// Manual-vs-connection precedence.
    #[serde(default)]
    pub value_priority: ValuePriority,
    /// Whether a value must be present after resolution.
    #[serde(default)]
    pub required: bool,
}

impl PortSpec {
    /// A connection-first, optional port.
    pub fn new(id: impl Into<String>, connection_type: ConnectionType) -> Self {
        Self {
            id: id.into(),
            connection_type,
            value_priority: ValuePriority::default(),
            required: false,
        }
    }

    /// Mark the port manual-first.
    #[must_use]
    pub fn manual_first(mut self) -> Self {
        self.value_priority = ValuePriority::ManualFirst;
        self
    }

    /// Mark the port required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
