//! Schema-driven secret masking.
//!
//! Secrets reach components in cleartext through the execution context, but
//! never appear in traces, node-I/O events, or warnings. Masking keys off
//! the declared port types, so it works identically for inputs and outputs.

use relay_core::SECRET_MASK;
use serde_json::Value;

use crate::schema::Schema;

/// Replace secret-typed values in a payload with the mask literal.
///
/// A wholly-secret schema masks the entire payload. Otherwise, every present
/// port whose connection type classifies as secret is replaced with `"***"`;
/// all other fields pass through untouched.
#[must_use]
pub fn mask_secrets(schema: &Schema, value: &Value) -> Value {
    if schema.is_secret() {
        return Value::String(SECRET_MASK.to_owned());
    }

    let Value::Object(fields) = value else {
        return value.clone();
    };

    let mut masked = fields.clone();
    for port in schema.ports() {
        if port.connection_type.is_secret() && masked.contains_key(&port.id) {
            masked.insert(port.id.clone(), Value::String(SECRET_MASK.to_owned()));
        }
    }
    Value::Object(masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{ConnectionType, PortSpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(vec![
            PortSpec::new("token", ConnectionType::Secret),
            PortSpec::new("auth", ConnectionType::Contract {
                name: "apiCredential".into(),
            }),
            PortSpec::new("name", ConnectionType::Text),
        ])
    }

    #[test]
    fn masks_secret_and_credential_ports() {
        let masked = mask_secrets(
            &schema(),
            &json!({"token": "s3cr3t", "auth": {"key": "k"}, "name": "visible"}),
        );
        assert_eq!(
            masked,
            json!({"token": "***", "auth": "***", "name": "visible"})
        );
    }

    #[test]
    fn absent_secret_ports_are_not_materialized() {
        let masked = mask_secrets(&schema(), &json!({"name": "visible"}));
        assert_eq!(masked, json!({"name": "visible"}));
    }

    #[test]
    fn wholly_secret_schema_masks_everything() {
        let masked = mask_secrets(
            &Schema::passthrough().secret(),
            &json!({"anything": "at all"}),
        );
        assert_eq!(masked, json!("***"));
    }

    #[test]
    fn non_object_payloads_pass_through() {
        assert_eq!(mask_secrets(&schema(), &json!("scalar")), json!("scalar"));
    }
}
