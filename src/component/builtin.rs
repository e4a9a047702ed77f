//! Built-in chat components.
//!
//! These are the components the engine itself ships: enough to assemble the
//! canonical `ChatInput -> Prompt -> LanguageModel -> ChatOutput` flow for
//! demos and tests. Provider-backed model components live in the external
//! component library and register alongside these.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

use super::{BoundInputs, Component, ComponentError, ComponentOutcome, InvokeContext};
use crate::graph::{InputSlot, OutputSlot, ValueType};
use crate::monitor::MessageRecord;

fn message_value(sender: &str, sender_name: &str, text: &str, session_id: &str) -> Value {
    json!({
        "text": text,
        "sender": sender,
        "sender_name": sender_name,
        "session_id": session_id,
    })
}

/// Entry point of a conversational flow: turns the request's input value
/// into a user message and records the turn.
pub struct ChatInput;

#[async_trait]
impl Component for ChatInput {
    fn declared_inputs(&self) -> Vec<InputSlot> {
        vec![InputSlot::with_default(
            "input_value",
            ValueType::Text,
            json!(""),
        )]
    }

    fn declared_outputs(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("message", ValueType::Message)]
    }

    async fn invoke(
        &self,
        inputs: BoundInputs,
        ctx: InvokeContext,
    ) -> Result<ComponentOutcome, ComponentError> {
        let text = inputs.text("input_value").unwrap_or_default();
        ctx.emit_message(
            MessageRecord::SENDER_USER,
            MessageRecord::SENDER_USER,
            text.clone(),
        )?;
        Ok(ComponentOutcome::single(
            "message",
            message_value(
                MessageRecord::SENDER_USER,
                MessageRecord::SENDER_USER,
                &text,
                &ctx.session_id,
            ),
        ))
    }
}

/// Renders a template by substituting the `{message}` placeholder with the
/// bound message's text.
pub struct Prompt;

#[async_trait]
impl Component for Prompt {
    fn declared_inputs(&self) -> Vec<InputSlot> {
        vec![
            InputSlot::required("template", ValueType::Text),
            InputSlot::with_default("message", ValueType::Any, json!("")),
        ]
    }

    fn declared_outputs(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("prompt", ValueType::Text)]
    }

    async fn invoke(
        &self,
        inputs: BoundInputs,
        _ctx: InvokeContext,
    ) -> Result<ComponentOutcome, ComponentError> {
        let template = inputs
            .text("template")
            .ok_or_else(|| ComponentError::vertex("prompt template is not bound"))?;
        let message = inputs.text("message").unwrap_or_default();
        let rendered = template.replace("{message}", &message);
        Ok(ComponentOutcome::single("prompt", json!(rendered)))
    }
}

/// Deterministic echo model: streams the prompt back token by token and
/// returns it as the assistant message. A stand-in until a provider-backed
/// model component is registered under the same type name.
pub struct LanguageModel {
    /// Pause between emitted tokens; zero by default, raised by tests that
    /// need an in-flight vertex to cancel.
    pub token_delay: Duration,
}

impl Default for LanguageModel {
    fn default() -> Self {
        Self {
            token_delay: Duration::ZERO,
        }
    }
}

impl LanguageModel {
    #[must_use]
    pub fn with_token_delay(token_delay: Duration) -> Self {
        Self { token_delay }
    }
}

#[async_trait]
impl Component for LanguageModel {
    fn declared_inputs(&self) -> Vec<InputSlot> {
        vec![InputSlot::required("prompt", ValueType::Text)]
    }

    fn declared_outputs(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("message", ValueType::Message)]
    }

    async fn invoke(
        &self,
        inputs: BoundInputs,
        ctx: InvokeContext,
    ) -> Result<ComponentOutcome, ComponentError> {
        let prompt = inputs
            .text("prompt")
            .ok_or_else(|| ComponentError::vertex("model prompt is not bound"))?;

        for (i, word) in prompt.split_whitespace().enumerate() {
            if ctx.is_cancelled() {
                return Err(ComponentError::vertex("generation cancelled"));
            }
            let chunk = if i == 0 {
                word.to_string()
            } else {
                format!(" {word}")
            };
            ctx.emit_token(chunk)?;
            if !self.token_delay.is_zero() {
                sleep(self.token_delay).await;
            }
        }

        Ok(ComponentOutcome::single(
            "message",
            message_value(
                MessageRecord::SENDER_MACHINE,
                "AI",
                &prompt,
                &ctx.session_id,
            ),
        ))
    }
}

/// Terminal of a conversational flow: records the machine's turn and passes
/// the message through.
pub struct ChatOutput;

#[async_trait]
impl Component for ChatOutput {
    fn declared_inputs(&self) -> Vec<InputSlot> {
        vec![InputSlot::required("message", ValueType::Any)]
    }

    fn declared_outputs(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("message", ValueType::Message)]
    }

    async fn invoke(
        &self,
        inputs: BoundInputs,
        ctx: InvokeContext,
    ) -> Result<ComponentOutcome, ComponentError> {
        let text = inputs
            .text("message")
            .ok_or_else(|| ComponentError::vertex("chat output message is not bound"))?;
        let record = ctx.emit_message(MessageRecord::SENDER_MACHINE, "AI", text.clone())?;
        Ok(ComponentOutcome::single(
            "message",
            message_value(
                MessageRecord::SENDER_MACHINE,
                "AI",
                &text,
                &record.session_id,
            ),
        ))
    }
}

/// Joins two text inputs; handy for fan-in topologies.
pub struct TextConcat;

#[async_trait]
impl Component for TextConcat {
    fn declared_inputs(&self) -> Vec<InputSlot> {
        vec![
            InputSlot::required("first", ValueType::Text),
            InputSlot::with_default("second", ValueType::Text, json!("")),
            InputSlot::with_default("separator", ValueType::Text, json!(" ")),
        ]
    }

    fn declared_outputs(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("text", ValueType::Text)]
    }

    async fn invoke(
        &self,
        inputs: BoundInputs,
        _ctx: InvokeContext,
    ) -> Result<ComponentOutcome, ComponentError> {
        let first = inputs
            .text("first")
            .ok_or_else(|| ComponentError::vertex("first text input is not bound"))?;
        let second = inputs.text("second").unwrap_or_default();
        let separator = inputs.text("separator").unwrap_or_else(|| " ".to_string());
        let joined = if second.is_empty() {
            first
        } else {
            format!("{first}{separator}{second}")
        };
        Ok(ComponentOutcome::single("text", json!(joined)))
    }
}
