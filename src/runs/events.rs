//! The run event vocabulary and its wire format.

use serde::{Deserialize, Serialize};

use crate::cache::BuildRecord;
use crate::graph::VertexId;
use crate::monitor::MessageRecord;

/// One event on a run's ordered stream.
///
/// Serialized on the wire as one JSON object per line, shaped
/// `{"event": <kind>, "data": <payload>}`:
///
/// ```
/// use loomflow::runs::FlowEvent;
///
/// let line = FlowEvent::End {}.to_json_value().to_string();
/// assert_eq!(line, r#"{"data":{},"event":"end"}"#);
/// ```
///
/// Events are appended only by the run coordinator and consumed read-only by
/// subscribers; their order is significant and preserved exactly as
/// produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum FlowEvent {
    /// Published before any vertex runs: `ids` are the in-scope vertices
    /// ready to start first, `to_run` the full resolved order.
    VerticesSorted {
        ids: Vec<VertexId>,
        to_run: Vec<VertexId>,
    },
    /// A conversational turn recorded by a component (pass-through).
    AddMessage(MessageRecord),
    /// A vertex finished (successfully, failed, or inactivated).
    EndVertex {
        id: VertexId,
        build_data: BuildRecord,
        valid: bool,
    },
    /// One chunk of incremental component output (pass-through).
    Token { id: VertexId, chunk: String },
    /// Terminal: the run failed or was cancelled.
    Error { message: String },
    /// Terminal: every in-scope vertex reached success or error.
    End {},
}

impl FlowEvent {
    /// The wire-format kind tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FlowEvent::VerticesSorted { .. } => "vertices_sorted",
            FlowEvent::AddMessage(_) => "add_message",
            FlowEvent::EndVertex { .. } => "end_vertex",
            FlowEvent::Token { .. } => "token",
            FlowEvent::Error { .. } => "error",
            FlowEvent::End {} => "end",
        }
    }

    /// Whether this event closes the stream. No event follows a terminal
    /// one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowEvent::Error { .. } | FlowEvent::End {})
    }

    /// The event as a JSON value in wire shape.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("event serialization is infallible")
    }

    /// One newline-terminated wire line.
    #[must_use]
    pub fn to_ndjson_line(&self) -> String {
        let mut line = self.to_json_value().to_string();
        line.push('\n');
        line
    }
}
