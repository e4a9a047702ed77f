//! Vertex identity, slot declarations, and runtime state.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::util::id;

/// Identifies one component instance within a flow graph.
///
/// Ids are human-readable slugs with a short random suffix so that two
/// instances of the same component type stay distinguishable in the editor
/// and in event payloads, e.g. `ChatInput-XtBLx`.
///
/// # Examples
///
/// ```
/// use loomflow::graph::VertexId;
///
/// let id = VertexId::from("ChatInput-XtBLx");
/// assert_eq!(id.as_str(), "ChatInput-XtBLx");
/// assert_eq!(id.to_string(), "ChatInput-XtBLx");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(String);

impl VertexId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id for the given component type name.
    #[must_use]
    pub fn generate(component_type: &str) -> Self {
        Self(format!("{component_type}-{}", id::short_suffix()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Value categories a slot can declare.
///
/// Slot typing is deliberately coarse: components exchange JSON values, and
/// the executor only rejects bindings that can never make sense (say, a
/// number wired into a message slot). `Any` is compatible in both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Text,
    Message,
    Number,
    Boolean,
    Json,
    Any,
}

impl ValueType {
    /// Whether a value of type `incoming` may be bound to a slot of this type.
    #[must_use]
    pub fn accepts(self, incoming: ValueType) -> bool {
        matches!(self, ValueType::Any)
            || matches!(incoming, ValueType::Any)
            || self == incoming
            // A message carries text; text slots take messages and vice versa
            // so prompt-style components can consume either form.
            || matches!(
                (self, incoming),
                (ValueType::Text, ValueType::Message) | (ValueType::Message, ValueType::Text)
            )
    }

    /// Classify a runtime JSON value.
    #[must_use]
    pub fn of_value(value: &Value) -> ValueType {
        match value {
            Value::String(_) => ValueType::Text,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            Value::Object(map) if map.contains_key("text") && map.contains_key("sender") => {
                ValueType::Message
            }
            _ => ValueType::Json,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueType::Text => "text",
            ValueType::Message => "message",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Json => "json",
            ValueType::Any => "any",
        };
        write!(f, "{label}")
    }
}

/// An input slot declared by a component implementation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputSlot {
    pub name: String,
    pub expected: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl InputSlot {
    /// A slot that must be bound by an edge, an override, or a vertex param.
    pub fn required(name: impl Into<String>, expected: ValueType) -> Self {
        Self {
            name: name.into(),
            expected,
            default: None,
        }
    }

    /// A slot that falls back to `default` when nothing is bound.
    pub fn with_default(name: impl Into<String>, expected: ValueType, default: Value) -> Self {
        Self {
            name: name.into(),
            expected,
            default: Some(default),
        }
    }
}

/// An output slot declared by a component implementation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputSlot {
    pub name: String,
    pub produces: ValueType,
}

impl OutputSlot {
    pub fn new(name: impl Into<String>, produces: ValueType) -> Self {
        Self {
            name: name.into(),
            produces,
        }
    }
}

/// Runtime execution state of a vertex within one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexState {
    #[default]
    Pending,
    Running,
    Success,
    Error,
}

/// One component instance in a flow graph.
///
/// A vertex carries identity and configuration only; runtime state lives with
/// the run that executes it. `params` holds per-vertex parameter bindings
/// from the editor, consulted after edge bindings and request overrides but
/// before the slot's declared default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub component_type: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub params: FxHashMap<String, Value>,
}

impl Vertex {
    /// Create a vertex with a freshly generated id.
    #[must_use]
    pub fn new(component_type: impl Into<String>) -> Self {
        let component_type = component_type.into();
        Self {
            id: VertexId::generate(&component_type),
            display_name: component_type.clone(),
            component_type,
            params: FxHashMap::default(),
        }
    }

    /// Create a vertex with an explicit id (persisted graphs, tests).
    #[must_use]
    pub fn with_id(id: impl Into<VertexId>, component_type: impl Into<String>) -> Self {
        let component_type = component_type.into();
        Self {
            id: id.into(),
            display_name: component_type.clone(),
            component_type,
            params: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}
