//! Built-in platform components.

use std::sync::Arc;

use async_trait::async_trait;
use relay_core::{ComponentId, ENTRYPOINT_COMPONENT, RUNTIME_DATA_KEY};
use relay_execution::ExecutionContext;
use serde_json::{Value, json};

use crate::component::{Component, ComponentOutput, ExecuteArgs};
use crate::error::ComponentError;
use crate::ports::{ConnectionType, PortSpec};
use crate::registry::ComponentRegistry;
use crate::schema::Schema;

/// The workflow entrypoint marker.
///
/// The engine injects the run's runtime inputs under the reserved
/// `__runtimeData` key for this component only; its output is that payload,
/// so downstream actions read runtime data as ordinary upstream output.
pub struct EntrypointComponent {
    id: ComponentId,
    inputs: Schema,
    outputs: Schema,
}

impl EntrypointComponent {
    /// Create the entrypoint component.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ComponentId::new(ENTRYPOINT_COMPONENT),
            inputs: Schema::passthrough(),
            outputs: Schema::passthrough(),
        }
    }
}

impl Default for EntrypointComponent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for EntrypointComponent {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    fn inputs(&self) -> &Schema {
        &self.inputs
    }

    fn outputs(&self) -> &Schema {
        &self.outputs
    }

    async fn execute(
        &self,
        args: ExecuteArgs,
        _ctx: ExecutionContext,
    ) -> Result<ComponentOutput, ComponentError> {
        let output = args
            .inputs
            .get(RUNTIME_DATA_KEY)
            .cloned()
            .unwrap_or_else(|| json!({}));
        Ok(ComponentOutput::value(output))
    }
}

/// Logs its `data` input to the run's log stream.
pub struct ConsoleLogComponent {
    id: ComponentId,
    inputs: Schema,
    outputs: Schema,
}

impl ConsoleLogComponent {
    /// Create the console-log component.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ComponentId::new("core.console.log"),
            inputs: Schema::new(vec![
                PortSpec::new("data", ConnectionType::Any),
                PortSpec::new("label", ConnectionType::Text),
            ]),
            outputs: Schema::passthrough(),
        }
    }
}

impl Default for ConsoleLogComponent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for ConsoleLogComponent {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    fn inputs(&self) -> &Schema {
        &self.inputs
    }

    fn outputs(&self) -> &Schema {
        &self.outputs
    }

    async fn execute(
        &self,
        args: ExecuteArgs,
        ctx: ExecutionContext,
    ) -> Result<ComponentOutput, ComponentError> {
        let data = args.inputs.get("data").cloned().unwrap_or(Value::Null);
        let rendered = match &data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let message = match args.inputs.get("label").and_then(Value::as_str) {
            Some(label) => format!("{label}: {rendered}"),
            None => rendered,
        };

        if let Some(logs) = &ctx.logs {
            logs.info(&message);
        }
        tracing::info!(node_ref = %ctx.component_ref, "{message}");

        Ok(ComponentOutput::value(json!({})))
    }
}

/// Echoes its resolved inputs as its output.
pub struct PassthroughComponent {
    id: ComponentId,
    inputs: Schema,
    outputs: Schema,
}

impl PassthroughComponent {
    /// Create the passthrough component.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ComponentId::new("core.util.passthrough"),
            inputs: Schema::passthrough(),
            outputs: Schema::passthrough(),
        }
    }
}

impl Default for PassthroughComponent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for PassthroughComponent {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    fn inputs(&self) -> &Schema {
        &self.inputs
    }

    fn outputs(&self) -> &Schema {
        &self.outputs
    }

    async fn execute(
        &self,
        args: ExecuteArgs,
        _ctx: ExecutionContext,
    ) -> Result<ComponentOutput, ComponentError> {
        Ok(ComponentOutput::value(args.inputs))
    }
}

/// Register every built-in component.
pub fn register_builtins(registry: &ComponentRegistry) {
    registry.register(Arc::new(EntrypointComponent::new()));
    registry.register(Arc::new(ConsoleLogComponent::new()));
    registry.register(Arc::new(PassthroughComponent::new()));
}
