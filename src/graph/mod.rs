//! Graph model, validation, scoping, and dependency resolution.
//!
//! A [`FlowGraph`] is the immutable snapshot of one flow's component graph:
//! typed vertices, typed edges, and per-vertex parameter bindings. The model
//! enforces structural invariants ([`FlowGraph::validate`]), derives the
//! minimal vertex set for start/stop boundaries ([`FlowGraph::scope`]), and
//! the [`resolver`] turns a scope into the deterministic execution order the
//! run coordinator follows.
//!
//! # Quick Start
//!
//! ```
//! use loomflow::graph::{resolver, Edge, FlowGraph, Vertex};
//!
//! let graph = FlowGraph::new("demo")
//!     .add_vertex(Vertex::with_id("In-aaaaa", "ChatInput"))
//!     .add_vertex(Vertex::with_id("Out-bbbbb", "ChatOutput"))
//!     .add_edge(Edge::new("In-aaaaa", "message", "Out-bbbbb", "message"));
//!
//! graph.validate()?;
//! let scope = graph.scope(None, None)?;
//! let order = resolver::order(&graph, &scope)?;
//! assert_eq!(order.len(), 2);
//! # Ok::<(), loomflow::graph::GraphError>(())
//! ```

mod edge;
mod error;
mod model;
pub mod resolver;
mod vertex;

pub use edge::Edge;
pub use error::GraphError;
pub use model::{FlowGraph, GraphData};
pub use vertex::{InputSlot, OutputSlot, ValueType, Vertex, VertexId, VertexState};
