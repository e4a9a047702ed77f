//! Vertex execution: input binding, type checks, invocation, timing.
//!
//! The executor's responsibility is deliberately narrow: assemble and
//! type-check one vertex's inputs, invoke its component through the
//! registry, measure elapsed time, and normalize the component's return
//! value or failure. One vertex's failure never touches another vertex's
//! state; isolation policy (inactivating dependents, aborting on fatal
//! errors) belongs to the run coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::component::{BoundInputs, ComponentError, ComponentRegistry, InvokeContext};
use crate::graph::{FlowGraph, ValueType, Vertex, VertexId};

/// The normalized result of one successful vertex execution.
#[derive(Clone, Debug)]
pub struct VertexOutput {
    /// The values bound to the vertex's input slots.
    pub inputs: FxHashMap<String, Value>,
    /// One value per declared output slot.
    pub outputs: FxHashMap<String, Value>,
    /// Wall-clock time spent inside the component.
    pub duration: Duration,
}

/// A failure local to one vertex execution.
#[derive(Debug, Error, Diagnostic)]
pub enum VertexError {
    /// An input slot has no edge binding, no override, and no default.
    #[error("missing input for {vertex}: slot '{slot}' has no value and no default")]
    #[diagnostic(
        code(loomflow::executor::missing_input),
        help("Connect an edge to the slot or give it a default value.")
    )]
    MissingInput { vertex: VertexId, slot: String },

    /// A bound value's type is incompatible with the slot's declared type.
    #[error("type mismatch for {vertex}.{slot}: expected {expected}, got {got}")]
    #[diagnostic(code(loomflow::executor::type_mismatch))]
    TypeMismatch {
        vertex: VertexId,
        slot: String,
        expected: ValueType,
        got: ValueType,
    },

    /// The vertex references a component type the registry does not know.
    #[error("unknown component type '{component_type}' for {vertex}")]
    #[diagnostic(
        code(loomflow::executor::unknown_component),
        help("Register the component type before running flows that use it.")
    )]
    UnknownComponent {
        vertex: VertexId,
        component_type: String,
    },

    /// The component raised; `fatal` ends the whole run.
    #[error("{message}")]
    #[diagnostic(code(loomflow::executor::component))]
    Component { message: String, fatal: bool },

    /// The run was cancelled while this vertex was in flight.
    #[error("vertex execution cancelled")]
    #[diagnostic(code(loomflow::executor::cancelled))]
    Cancelled,
}

impl VertexError {
    /// Whether this failure must end the whole run rather than inactivate
    /// dependents.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, VertexError::Component { fatal: true, .. })
    }
}

impl From<ComponentError> for VertexError {
    fn from(err: ComponentError) -> Self {
        VertexError::Component {
            message: err.message,
            fatal: err.fatal,
        }
    }
}

/// Executes single vertices against the component registry.
pub struct VertexExecutor {
    registry: Arc<ComponentRegistry>,
}

impl VertexExecutor {
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Run one vertex.
    ///
    /// `upstream` maps already-completed vertices to their output values;
    /// `overrides` are request-supplied values for this vertex's slots.
    /// Binding precedence per slot: inbound edge value, then override, then
    /// the vertex's own parameter, then the slot's declared default. A slot
    /// left unbound fails before the component's logic runs.
    pub async fn execute(
        &self,
        graph: &FlowGraph,
        vertex: &Vertex,
        upstream: &FxHashMap<VertexId, FxHashMap<String, Value>>,
        overrides: &FxHashMap<String, Value>,
        ctx: InvokeContext,
    ) -> Result<VertexOutput, VertexError> {
        let component = self.registry.get(&vertex.component_type).ok_or_else(|| {
            VertexError::UnknownComponent {
                vertex: vertex.id.clone(),
                component_type: vertex.component_type.clone(),
            }
        })?;

        let bound = self.bind_inputs(graph, vertex, &component.declared_inputs(), upstream, overrides)?;
        let inputs = bound.clone();

        tracing::debug!(
            vertex = %vertex.id,
            component = %vertex.component_type,
            slots = inputs.len(),
            "invoking component"
        );

        let started = Instant::now();
        let result = component.invoke(BoundInputs::new(bound), ctx).await;
        let duration = started.elapsed();

        match result {
            Ok(outcome) => Ok(VertexOutput {
                inputs,
                outputs: outcome.into_outputs(),
                duration,
            }),
            Err(err) => {
                tracing::warn!(
                    vertex = %vertex.id,
                    component = %vertex.component_type,
                    fatal = err.fatal,
                    error = %err.message,
                    "component invocation failed"
                );
                Err(err.into())
            }
        }
    }

    fn bind_inputs(
        &self,
        graph: &FlowGraph,
        vertex: &Vertex,
        slots: &[crate::graph::InputSlot],
        upstream: &FxHashMap<VertexId, FxHashMap<String, Value>>,
        overrides: &FxHashMap<String, Value>,
    ) -> Result<FxHashMap<String, Value>, VertexError> {
        let mut bound: FxHashMap<String, Value> = FxHashMap::default();
        for slot in slots {
            let edge_value = graph
                .inbound_edges(&vertex.id)
                .find(|e| e.target_input == slot.name)
                .and_then(|e| {
                    upstream
                        .get(&e.source)
                        .and_then(|outputs| outputs.get(&e.source_output))
                });

            let value = edge_value
                .or_else(|| overrides.get(&slot.name))
                .or_else(|| vertex.params.get(&slot.name))
                .or(slot.default.as_ref());

            let Some(value) = value else {
                return Err(VertexError::MissingInput {
                    vertex: vertex.id.clone(),
                    slot: slot.name.clone(),
                });
            };

            let got = ValueType::of_value(value);
            if !slot.expected.accepts(got) {
                return Err(VertexError::TypeMismatch {
                    vertex: vertex.id.clone(),
                    slot: slot.name.clone(),
                    expected: slot.expected,
                    got,
                });
            }
            bound.insert(slot.name.clone(), value.clone());
        }
        Ok(bound)
    }
}
