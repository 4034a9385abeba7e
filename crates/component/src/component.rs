//! The component execution contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::ComponentId;
use relay_execution::ExecutionContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ComponentError;
use crate::schema::Schema;

/// The arguments a component executes with: resolved inputs and design-time
/// params, both already parsed against the component's schemas.
#[derive(Debug, Clone)]
pub struct ExecuteArgs {
    /// Resolved input port values.
    pub inputs: Value,
    /// Design-time configuration values.
    pub params: Value,
}

/// The awaiting-input sentinel a component returns to pause externally.
///
/// The engine records `AWAITING_INPUT`, files an input request through its
/// gateway, and completes the action when a resolution arrives — or fails it
/// with a timeout if `timeout_at` passes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInput {
    /// What kind of input is requested (e.g. `"approval"`, `"choice"`).
    pub input_type: String,
    /// Title shown to the responder.
    pub title: String,
    /// Longer description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arbitrary context forwarded to the responder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_data: Option<Value>,
    /// Schema of the expected response payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// Deadline for a resolution to arrive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_at: Option<DateTime<Utc>>,
}

/// What a component invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentOutput {
    /// A plain output, to be parsed against the output schema.
    Value(Value),
    /// A conditional output: only the named output ports fire.
    Routed {
        /// The output value.
        value: Value,
        /// Output ports whose success edges fire; all others are cancelled.
        active_ports: Vec<String>,
    },
    /// The awaiting-input sentinel.
    Pending(PendingInput),
}

impl ComponentOutput {
    /// A plain output value.
    #[must_use]
    pub fn value(value: Value) -> Self {
        Self::Value(value)
    }

    /// A conditionally-routed output.
    #[must_use]
    pub fn routed(value: Value, active_ports: Vec<String>) -> Self {
        Self::Routed {
            value,
            active_ports,
        }
    }

    /// An awaiting-input sentinel.
    #[must_use]
    pub fn pending(pending: PendingInput) -> Self {
        Self::Pending(pending)
    }
}

/// A typed, registered function with declared input/output ports.
///
/// Components are registered once per process and invoked concurrently;
/// implementations hold no per-invocation state. A component driven by a
/// retrying harness must be idempotent within a single action.
#[async_trait]
pub trait Component: Send + Sync {
    /// The component's registry id.
    fn id(&self) -> &ComponentId;

    /// Declared input ports.
    fn inputs(&self) -> &Schema;

    /// Declared output ports.
    fn outputs(&self) -> &Schema;

    /// Declared parameter schema, if any.
    fn parameters(&self) -> Option<&Schema> {
        None
    }

    /// Whether the execution context should carry the secret store.
    fn requires_secrets(&self) -> bool {
        false
    }

    /// Execute one invocation.
    async fn execute(
        &self,
        args: ExecuteArgs,
        ctx: ExecutionContext,
    ) -> Result<ComponentOutput, ComponentError>;
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component").field("id", self.id()).finish()
    }
}
