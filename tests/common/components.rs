use async_trait::async_trait;
use serde_json::json;
use tokio::time::{sleep, Duration};

use loomflow::component::{
    BoundInputs, Component, ComponentError, ComponentOutcome, InvokeContext,
};
use loomflow::graph::{InputSlot, OutputSlot, ValueType};

/// Fails every invocation; `fatal` controls whether the run survives.
pub struct FailingComponent {
    pub message: &'static str,
    pub fatal: bool,
}

impl FailingComponent {
    pub fn vertex_local(message: &'static str) -> Self {
        Self {
            message,
            fatal: false,
        }
    }

    pub fn fatal(message: &'static str) -> Self {
        Self {
            message,
            fatal: true,
        }
    }
}

#[async_trait]
impl Component for FailingComponent {
    fn declared_inputs(&self) -> Vec<InputSlot> {
        vec![InputSlot::with_default("input", ValueType::Any, json!(null))]
    }

    fn declared_outputs(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("output", ValueType::Any)]
    }

    async fn invoke(
        &self,
        _inputs: BoundInputs,
        _ctx: InvokeContext,
    ) -> Result<ComponentOutcome, ComponentError> {
        if self.fatal {
            Err(ComponentError::fatal(self.message))
        } else {
            Err(ComponentError::vertex(self.message))
        }
    }
}

/// Sleeps in small cancellable slices, then echoes its input.
pub struct SlowComponent {
    pub total: Duration,
}

#[async_trait]
impl Component for SlowComponent {
    fn declared_inputs(&self) -> Vec<InputSlot> {
        vec![InputSlot::with_default(
            "input",
            ValueType::Any,
            json!("slow"),
        )]
    }

    fn declared_outputs(&self) -> Vec<OutputSlot> {
        vec![OutputSlot::new("output", ValueType::Any)]
    }

    async fn invoke(
        &self,
        inputs: BoundInputs,
        ctx: InvokeContext,
    ) -> Result<ComponentOutcome, ComponentError> {
        let slice = Duration::from_millis(5);
        let mut remaining = self.total;
        while !remaining.is_zero() {
            if ctx.is_cancelled() {
                return Err(ComponentError::vertex("interrupted"));
            }
            let step = remaining.min(slice);
            sleep(step).await;
            remaining -= step;
        }
        let value = inputs.get("input").cloned().unwrap_or(json!(null));
        Ok(ComponentOutcome::single("output", value))
    }
}
