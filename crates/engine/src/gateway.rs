//! The external human-input seam.
//!
//! When a component returns the awaiting-input sentinel, the engine files a
//! request through an [`InputGateway`] and suspends the action until a
//! resolution arrives. The gateway is the only place this asynchrony
//! touches: a durable harness implements it with signals, tests implement
//! it with channels.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_component::{ComponentError, PendingInput};
use relay_core::{ActionRef, RunId};
use serde_json::{Map, Value, json};

/// An external response to a pending input request.
#[derive(Debug, Clone, PartialEq)]
pub struct InputResolution {
    /// Whether the request was approved.
    pub approved: bool,
    /// Who responded.
    pub responded_by: Option<String>,
    /// Free-form note from the responder.
    pub response_note: Option<String>,
    /// When the response arrived.
    pub responded_at: DateTime<Utc>,
    /// Id of the resolved request.
    pub request_id: String,
    /// Options the responder selected, for choice-type requests.
    pub selected_options: Vec<String>,
    /// Additional response payload merged into the action's output.
    pub response_data: Option<Value>,
}

impl InputResolution {
    /// An approval.
    pub fn approved(request_id: impl Into<String>) -> Self {
        Self {
            approved: true,
            responded_by: None,
            response_note: None,
            responded_at: Utc::now(),
            request_id: request_id.into(),
            selected_options: Vec::new(),
            response_data: None,
        }
    }

    /// A rejection.
    pub fn rejected(request_id: impl Into<String>) -> Self {
        Self {
            approved: false,
            ..Self::approved(request_id)
        }
    }

    /// Set who responded.
    #[must_use]
    pub fn with_responder(mut self, responded_by: impl Into<String>) -> Self {
        self.responded_by = Some(responded_by.into());
        self
    }

    /// Set the selected options.
    #[must_use]
    pub fn with_options(mut self, selected_options: Vec<String>) -> Self {
        self.selected_options = selected_options;
        self
    }

    /// The output ports this resolution activates.
    ///
    /// Selected options fire one `option:<value>` port each; otherwise the
    /// `approved` or `rejected` port fires.
    #[must_use]
    pub fn active_ports(&self) -> Vec<String> {
        if self.selected_options.is_empty() {
            vec![if self.approved { "approved" } else { "rejected" }.to_owned()]
        } else {
            self.selected_options
                .iter()
                .map(|option| format!("option:{option}"))
                .collect()
        }
    }

    /// The action output this resolution completes with.
    #[must_use]
    pub fn into_output(self) -> Value {
        let mut output = Map::new();
        output.insert("approved".into(), json!(self.approved));
        output.insert("rejected".into(), json!(!self.approved));
        output.insert("respondedBy".into(), json!(self.responded_by));
        output.insert("responseNote".into(), json!(self.response_note));
        output.insert("respondedAt".into(), json!(self.responded_at));
        output.insert("requestId".into(), json!(self.request_id));
        if let Some(Value::Object(extra)) = self.response_data {
            for (key, value) in extra {
                output.insert(key, value);
            }
        }
        Value::Object(output)
    }
}

/// Files input requests with the outside world and awaits their resolutions.
///
/// `request` resolves when a human (or the harness acting for one) responds.
/// The engine enforces the sentinel's `timeout_at` around this call; slow
/// implementations need no timeout logic of their own.
#[async_trait]
pub trait InputGateway: Send + Sync {
    /// File a request and await its resolution.
    async fn request(
        &self,
        run_id: RunId,
        node_ref: &ActionRef,
        request: PendingInput,
    ) -> Result<InputResolution, ComponentError>;
}

/// Gateway used when no real gateway is wired: every request fails.
#[derive(Debug, Default)]
pub struct UnconfiguredGateway;

#[async_trait]
impl InputGateway for UnconfiguredGateway {
    async fn request(
        &self,
        _run_id: RunId,
        node_ref: &ActionRef,
        _request: PendingInput,
    ) -> Result<InputResolution, ComponentError> {
        Err(ComponentError::Configuration(format!(
            "action '{node_ref}' requested external input but no input gateway is configured"
        )))
    }
}

/// Gateway that immediately approves every request, for demos and tests.
#[derive(Debug, Default)]
pub struct AutoApproveGateway;

#[async_trait]
impl InputGateway for AutoApproveGateway {
    async fn request(
        &self,
        run_id: RunId,
        node_ref: &ActionRef,
        _request: PendingInput,
    ) -> Result<InputResolution, ComponentError> {
        Ok(InputResolution::approved(format!("{run_id}:{node_ref}"))
            .with_responder("auto-approve"))
    }
}
