//! Structural errors raised while validating, scoping, or ordering a graph.

use miette::Diagnostic;
use thiserror::Error;

use super::edge::Edge;
use super::vertex::VertexId;

/// Errors that make a graph unrunnable.
///
/// All variants are fatal at validation time: the run never starts and no
/// job id is issued. They surface synchronously as the failed run-start
/// response.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// The edge set contains a cycle; `vertices` are the members left with
    /// unresolved predecessors when ordering drained early.
    #[error("graph contains a cycle involving: {}", format_ids(vertices))]
    #[diagnostic(
        code(loomflow::graph::cycle),
        help("Remove one of the edges closing the loop; flows must be acyclic.")
    )]
    Cycle { vertices: Vec<VertexId> },

    /// An edge references a vertex or slot that does not exist.
    #[error("edge references a missing vertex or slot: {edge} ({detail})")]
    #[diagnostic(code(loomflow::graph::dangling_edge))]
    DanglingEdge { edge: Edge, detail: String },

    /// An input slot receives more than one incoming edge.
    #[error("input slot {target}.{slot} receives more than one edge")]
    #[diagnostic(
        code(loomflow::graph::duplicate_inbound),
        help("Each input slot accepts at most one incoming connection.")
    )]
    DuplicateInbound { target: VertexId, slot: String },

    /// Two vertices share the same id.
    #[error("duplicate vertex id: {id}")]
    #[diagnostic(code(loomflow::graph::duplicate_vertex))]
    DuplicateVertex { id: VertexId },

    /// Scoping produced no vertices to run (unknown start/stop id, or the
    /// boundaries exclude everything).
    #[error("nothing to run: {detail}")]
    #[diagnostic(
        code(loomflow::graph::empty_scope),
        help("Check that start/stop component ids exist in this flow.")
    )]
    EmptyScope { detail: String },
}

fn format_ids(ids: &[VertexId]) -> String {
    ids.iter()
        .map(VertexId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
