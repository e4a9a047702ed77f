//! Typed data dependencies between vertices.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::vertex::VertexId;

/// A typed data dependency from one vertex's output slot to another
/// vertex's input slot.
///
/// Edge identity is the full (source, source output, target, target input)
/// tuple. Endpoint existence and slot-type compatibility are checked at
/// resolve time rather than at edge creation, since components can be edited
/// independently of the graphs that reference them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub source_output: String,
    pub target: VertexId,
    pub target_input: String,
}

impl Edge {
    pub fn new(
        source: impl Into<VertexId>,
        source_output: impl Into<String>,
        target: impl Into<VertexId>,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_output: source_output.into(),
            target: target.into(),
            target_input: target_input.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.source_output, self.target, self.target_input
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_both_endpoints() {
        let edge = Edge::new("A-1", "text", "B-2", "input");
        assert_eq!(edge.to_string(), "A-1.text -> B-2.input");
    }
}
