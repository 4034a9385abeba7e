//! Input resolution: building one action's payload from upstream outputs.

use std::collections::HashMap;

use relay_component::{Component, ValuePriority};
use relay_core::{ActionRef, SELF_HANDLE};
use relay_execution::ActionOutcome;
use relay_storage::SpillMarker;
use relay_workflow::ActionDefinition;
use serde_json::{Map, Value};

/// An input mapping that produced no usable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveWarning {
    /// The input port that stayed unset.
    pub target: String,
    /// The upstream action the mapping points at.
    pub source_ref: ActionRef,
    /// The upstream handle the mapping points at.
    pub source_handle: String,
    /// Coercion detail, when the value existed but did not fit the port.
    pub detail: Option<String>,
}

impl ResolveWarning {
    /// The human-readable description surfaced in traces and field errors.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) => format!(
                "Input '{}' from '{}.{}' could not be coerced: {detail}",
                self.target, self.source_ref, self.source_handle
            ),
            None => format!(
                "Input '{}' expected from '{}.{}' but no value was produced",
                self.target, self.source_ref, self.source_handle
            ),
        }
    }
}

/// A connected value skipped because a manual-first port already had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualOverride {
    /// The input port keeping its manual value.
    pub target: String,
    /// The upstream action whose value was skipped.
    pub source_ref: ActionRef,
}

/// The resolver's result: inputs, params, and everything worth reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPayload {
    /// Input port values, starting from the action's overrides.
    pub inputs: Map<String, Value>,
    /// Design-time params, copied through.
    pub params: Map<String, Value>,
    /// Mappings that produced no value; the runner elevates these to a hard
    /// validation failure.
    pub warnings: Vec<ResolveWarning>,
    /// Manual-first ports that kept their override.
    pub manual_overrides: Vec<ManualOverride>,
}

/// Build one action's execution payload from upstream outputs.
///
/// Pure over its arguments and never fails: problems become warnings.
/// Mappings are processed in target-port order so warnings and override
/// events are deterministic across runs.
///
/// Spill markers pass through tagged with the requested handle rather than
/// being dereferenced here; the runner materializes them from storage.
#[must_use]
pub fn build_action_payload(
    action: &ActionDefinition,
    results: &HashMap<ActionRef, ActionOutcome>,
    component: &dyn Component,
) -> ResolvedPayload {
    let mut inputs = action.input_overrides.clone();
    let params = action.params.clone();
    let mut warnings = Vec::new();
    let mut manual_overrides = Vec::new();

    let mut mappings: Vec<_> = action.input_mappings.iter().collect();
    mappings.sort_by_key(|(target, _)| target.as_str());

    for (target, mapping) in mappings {
        let port = component.inputs().port(target);

        if let Some(port) = port
            && port.value_priority == ValuePriority::ManualFirst
            && inputs.get(target).is_some_and(|v| !v.is_null())
        {
            manual_overrides.push(ManualOverride {
                target: target.clone(),
                source_ref: mapping.source_ref.clone(),
            });
            continue;
        }

        let Some(source) = results
            .get(&mapping.source_ref)
            .and_then(|outcome| outcome.output.as_ref())
        else {
            warnings.push(ResolveWarning {
                target: target.clone(),
                source_ref: mapping.source_ref.clone(),
                source_handle: mapping.source_handle.clone(),
                detail: None,
            });
            continue;
        };

        if let Some(marker) = SpillMarker::from_value(source) {
            inputs.insert(
                target.clone(),
                marker.with_handle(mapping.source_handle.clone()).to_value(),
            );
            continue;
        }

        let resolved = if mapping.source_handle == SELF_HANDLE {
            Some(source.clone())
        } else {
            source.get(&mapping.source_handle).cloned()
        };
        let Some(value) = resolved else {
            warnings.push(ResolveWarning {
                target: target.clone(),
                source_ref: mapping.source_ref.clone(),
                source_handle: mapping.source_handle.clone(),
                detail: None,
            });
            continue;
        };

        match port {
            Some(port) => match port.connection_type.coerce(&value) {
                Ok(coerced) => {
                    inputs.insert(target.clone(), coerced);
                }
                Err(err) => {
                    warnings.push(ResolveWarning {
                        target: target.clone(),
                        source_ref: mapping.source_ref.clone(),
                        source_handle: mapping.source_handle.clone(),
                        detail: Some(err.to_string()),
                    });
                }
            },
            // Undeclared ports pass through; the schema parse decides later.
            None => {
                inputs.insert(target.clone(), value);
            }
        }
    }

    ResolvedPayload {
        inputs,
        params,
        warnings,
        manual_overrides,
    }
}
