//! The uniform component invocation contract.
//!
//! The component library proper (model providers, vector stores, tools) is
//! external to the engine. Everything the engine needs from a component is
//! captured by the [`Component`] trait: declared input/output slots and a
//! single `invoke` call. Implementations are resolved by type name through
//! the [`ComponentRegistry`], populated at process start.
//!
//! Incremental output does not change the return type: a component that
//! streams (token-by-token generation, chat message recording) emits through
//! its [`InvokeContext`] while running and still returns one final
//! [`ComponentOutcome`]. The coordinator drains the context's channel
//! concurrently with awaiting the result, so emitted events land on the run
//! stream in arrival order, between the vertex's start and its `end_vertex`.

mod builtin;
mod registry;

pub use builtin::{ChatInput, ChatOutput, LanguageModel, Prompt, TextConcat};
pub use registry::ComponentRegistry;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::graph::{InputSlot, OutputSlot, VertexId};
use crate::monitor::MessageRecord;

/// Values bound to a vertex's declared input slots, ready for invocation.
#[derive(Clone, Debug, Default)]
pub struct BoundInputs {
    values: FxHashMap<String, Value>,
}

impl BoundInputs {
    #[must_use]
    pub fn new(values: FxHashMap<String, Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.values.get(slot)
    }

    /// The slot's value rendered as text. Message-shaped objects render
    /// their `text` field; other values render as compact JSON.
    #[must_use]
    pub fn text(&self, slot: &str) -> Option<String> {
        self.values.get(slot).map(render_text)
    }

    pub fn require(&self, slot: &str) -> Result<&Value, ComponentError> {
        self.values
            .get(slot)
            .ok_or_else(|| ComponentError::vertex(format!("input slot '{slot}' is not bound")))
    }

    #[must_use]
    pub fn into_values(self) -> FxHashMap<String, Value> {
        self.values
    }

    #[must_use]
    pub fn values(&self) -> &FxHashMap<String, Value> {
        &self.values
    }
}

/// Render a bound value as plain text.
fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("text") {
            Some(Value::String(s)) => s.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// Events a component can emit while running.
///
/// Payloads are opaque to the coordinator: it forwards them onto the run's
/// event stream without interpretation.
#[derive(Clone, Debug)]
pub enum ComponentEvent {
    /// One chunk of incremental output.
    Token { chunk: String },
    /// A conversational turn to record and surface.
    Message { record: MessageRecord },
}

/// Execution environment handed to a component invocation.
///
/// Carries the identifiers a component needs to label its emissions plus the
/// emission channel itself and the run's cooperative cancellation signal.
#[derive(Clone, Debug)]
pub struct InvokeContext {
    pub vertex_id: VertexId,
    pub flow_id: String,
    pub session_id: String,
    events: flume::Sender<ComponentEvent>,
    cancelled: watch::Receiver<bool>,
}

impl InvokeContext {
    #[must_use]
    pub fn new(
        vertex_id: VertexId,
        flow_id: impl Into<String>,
        session_id: impl Into<String>,
        events: flume::Sender<ComponentEvent>,
        cancelled: watch::Receiver<bool>,
    ) -> Self {
        Self {
            vertex_id,
            flow_id: flow_id.into(),
            session_id: session_id.into(),
            events,
            cancelled,
        }
    }

    /// Emit one chunk of incremental output.
    pub fn emit_token(&self, chunk: impl Into<String>) -> Result<(), InvokeContextError> {
        self.events
            .send(ComponentEvent::Token {
                chunk: chunk.into(),
            })
            .map_err(|_| InvokeContextError::ChannelClosed)
    }

    /// Record a conversational turn and surface it on the event stream.
    /// Returns the record so callers can reference its id.
    pub fn emit_message(
        &self,
        sender: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<MessageRecord, InvokeContextError> {
        let record = MessageRecord::new(
            self.flow_id.clone(),
            self.session_id.clone(),
            sender,
            sender_name,
            text,
        );
        self.events
            .send(ComponentEvent::Message {
                record: record.clone(),
            })
            .map_err(|_| InvokeContextError::ChannelClosed)?;
        Ok(record)
    }

    /// Whether the run has been cancelled. Long-running components should
    /// check this between units of work and return early.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

/// Errors from context emission.
#[derive(Debug, Error, Diagnostic)]
pub enum InvokeContextError {
    /// The run stopped consuming events (completed or cancelled).
    #[error("component event channel closed")]
    #[diagnostic(
        code(loomflow::component::channel_closed),
        help("The run is no longer draining this vertex; stop emitting.")
    )]
    ChannelClosed,
}

/// The final result of a component invocation: one value per declared
/// output slot.
#[derive(Clone, Debug, Default)]
pub struct ComponentOutcome {
    outputs: FxHashMap<String, Value>,
}

impl ComponentOutcome {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An outcome with a single output slot.
    #[must_use]
    pub fn single(slot: impl Into<String>, value: Value) -> Self {
        Self::new().with_output(slot, value)
    }

    #[must_use]
    pub fn with_output(mut self, slot: impl Into<String>, value: Value) -> Self {
        self.outputs.insert(slot.into(), value);
        self
    }

    #[must_use]
    pub fn outputs(&self) -> &FxHashMap<String, Value> {
        &self.outputs
    }

    #[must_use]
    pub fn into_outputs(self) -> FxHashMap<String, Value> {
        self.outputs
    }
}

/// A component failure with a human-readable message.
///
/// `fatal` distinguishes vertex-local failures (the run continues for
/// branches that do not depend on this vertex) from failures that must end
/// the whole run, such as an unrecoverable provider outage.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(loomflow::component::failure))]
pub struct ComponentError {
    pub message: String,
    pub fatal: bool,
}

impl ComponentError {
    /// A vertex-local failure: dependents are inactivated, the run continues.
    pub fn vertex(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    /// A failure that ends the whole run.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }
}

impl From<InvokeContextError> for ComponentError {
    fn from(err: InvokeContextError) -> Self {
        ComponentError::vertex(err.to_string())
    }
}

/// The capability interface every component type implements.
#[async_trait]
pub trait Component: Send + Sync {
    /// Input slots this component consumes, in declaration order.
    fn declared_inputs(&self) -> Vec<InputSlot>;

    /// Output slots this component produces, in declaration order.
    fn declared_outputs(&self) -> Vec<OutputSlot>;

    /// Run the component against bound inputs.
    async fn invoke(
        &self,
        inputs: BoundInputs,
        ctx: InvokeContext,
    ) -> Result<ComponentOutcome, ComponentError>;
}
