//! Lightweight output summaries for completion events.

use serde_json::{Map, Value, json};

/// Longest string retained verbatim in a summary.
const MAX_SUMMARY_STRING: usize = 256;

/// Summarize an output for a `NODE_COMPLETED` event.
///
/// Keeps top-level scalar and boolean fields, replaces arrays with their
/// lengths, drops nested objects, and flags the result with
/// `_truncated: true`. The input is expected to be masked already; the
/// summary never looks inside nested values.
#[must_use]
pub fn summarize_output(output: &Value) -> Value {
    match output {
        Value::Object(fields) => {
            let mut summary = Map::new();
            for (key, value) in fields {
                match value {
                    Value::Null | Value::Bool(_) | Value::Number(_) => {
                        summary.insert(key.clone(), value.clone());
                    }
                    Value::String(s) => {
                        let kept: String = s.chars().take(MAX_SUMMARY_STRING).collect();
                        summary.insert(key.clone(), Value::String(kept));
                    }
                    Value::Array(items) => {
                        summary.insert(key.clone(), json!({"length": items.len()}));
                    }
                    Value::Object(_) => {}
                }
            }
            summary.insert("_truncated".to_owned(), Value::Bool(true));
            Value::Object(summary)
        }
        Value::Array(items) => json!({"length": items.len(), "_truncated": true}),
        Value::String(s) => {
            let kept: String = s.chars().take(MAX_SUMMARY_STRING).collect();
            json!({"value": kept, "_truncated": true})
        }
        scalar => json!({"value": scalar, "_truncated": true}),
    }
}
