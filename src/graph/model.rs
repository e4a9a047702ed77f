//! The flow graph: vertices, edges, validation, and scoping.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::edge::Edge;
use super::error::GraphError;
use super::resolver;
use super::vertex::{Vertex, VertexId};

/// Serialized shape of a graph as persisted by the editor or carried in a
/// build request's `data` field.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// An immutable snapshot of one flow's component graph.
///
/// The vertex list preserves creation order; that order is the deterministic
/// tie-break key used by the resolver, so repeated runs of the same graph
/// list and execute ready vertices identically. Edits never mutate a graph
/// in place; they produce a new snapshot under the same flow id.
///
/// # Examples
///
/// ```
/// use loomflow::graph::{Edge, FlowGraph, Vertex};
///
/// let graph = FlowGraph::new("demo-flow")
///     .add_vertex(Vertex::with_id("ChatInput-aaaaa", "ChatInput"))
///     .add_vertex(Vertex::with_id("ChatOutput-bbbbb", "ChatOutput"))
///     .add_edge(Edge::new(
///         "ChatInput-aaaaa",
///         "message",
///         "ChatOutput-bbbbb",
///         "message",
///     ));
///
/// assert_eq!(graph.vertices().len(), 2);
/// assert!(graph.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct FlowGraph {
    flow_id: String,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    index: FxHashMap<VertexId, usize>,
}

impl FlowGraph {
    /// Create an empty graph for the given flow id.
    #[must_use]
    pub fn new(flow_id: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            vertices: Vec::new(),
            edges: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Build a graph from its persisted shape, rejecting duplicate ids.
    pub fn from_data(flow_id: impl Into<String>, data: GraphData) -> Result<Self, GraphError> {
        let mut graph = Self::new(flow_id);
        for vertex in data.vertices {
            if graph.index.contains_key(&vertex.id) {
                return Err(GraphError::DuplicateVertex { id: vertex.id });
            }
            graph = graph.add_vertex(vertex);
        }
        graph.edges = data.edges;
        Ok(graph)
    }

    /// Append a vertex. Later vertices sort after earlier ones when both are
    /// ready at the same time.
    #[must_use]
    pub fn add_vertex(mut self, vertex: Vertex) -> Self {
        self.index.insert(vertex.id.clone(), self.vertices.len());
        self.vertices.push(vertex);
        self
    }

    /// Append an edge. Endpoints are checked by [`validate`](Self::validate),
    /// not here, since components can be edited independently.
    #[must_use]
    pub fn add_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    #[must_use]
    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn vertex(&self, id: &VertexId) -> Option<&Vertex> {
        self.index.get(id).map(|&i| &self.vertices[i])
    }

    #[must_use]
    pub fn contains(&self, id: &VertexId) -> bool {
        self.index.contains_key(id)
    }

    /// Position of a vertex in creation order.
    #[must_use]
    pub fn creation_index(&self, id: &VertexId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Edges feeding the given vertex.
    pub fn inbound_edges<'a>(&'a self, id: &'a VertexId) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.target == id)
    }

    /// Edges leaving the given vertex.
    pub fn outbound_edges<'a>(&'a self, id: &'a VertexId) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.source == id)
    }

    /// Direct predecessors, deduplicated, in edge order.
    #[must_use]
    pub fn predecessors(&self, id: &VertexId) -> Vec<VertexId> {
        let mut seen = FxHashSet::default();
        self.inbound_edges(id)
            .filter(|e| seen.insert(e.source.clone()))
            .map(|e| e.source.clone())
            .collect()
    }

    /// Direct successors, deduplicated, in edge order.
    #[must_use]
    pub fn successors(&self, id: &VertexId) -> Vec<VertexId> {
        let mut seen = FxHashSet::default();
        self.outbound_edges(id)
            .filter(|e| seen.insert(e.target.clone()))
            .map(|e| e.target.clone())
            .collect()
    }

    /// Check structural invariants without mutating the graph.
    ///
    /// Verifies that every edge references existing vertices and declared
    /// slots are unique per input, and that the edge set is acyclic. Cycle
    /// detection reuses the resolver's ordering pass: vertices left with
    /// unresolved predecessors when the ready queue drains are the cycle
    /// members.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut bound_inputs: FxHashSet<(&VertexId, &str)> = FxHashSet::default();
        for edge in &self.edges {
            if !self.contains(&edge.source) {
                return Err(GraphError::DanglingEdge {
                    edge: edge.clone(),
                    detail: format!("source vertex {} not in graph", edge.source),
                });
            }
            if !self.contains(&edge.target) {
                return Err(GraphError::DanglingEdge {
                    edge: edge.clone(),
                    detail: format!("target vertex {} not in graph", edge.target),
                });
            }
            if !bound_inputs.insert((&edge.target, edge.target_input.as_str())) {
                return Err(GraphError::DuplicateInbound {
                    target: edge.target.clone(),
                    slot: edge.target_input.clone(),
                });
            }
        }

        if self.vertices.is_empty() {
            return Ok(());
        }
        let all: FxHashSet<VertexId> = self.index.keys().cloned().collect();
        resolver::order(self, &all).map(|_| ())
    }

    /// Derive the minimal vertex set that must run for the given boundaries.
    ///
    /// With a stop id, the scope is the stop vertex plus all of its
    /// ancestors. With a start id, the start vertex's required ancestors are
    /// always included; its descendants are included only when no stop id
    /// narrows the run. Scoping never removes edges from the graph; it
    /// yields the vertex-id set the resolver restricts itself to.
    pub fn scope(
        &self,
        start: Option<&VertexId>,
        stop: Option<&VertexId>,
    ) -> Result<FxHashSet<VertexId>, GraphError> {
        for (label, id) in [("start", start), ("stop", stop)] {
            if let Some(id) = id
                && !self.contains(id)
            {
                return Err(GraphError::EmptyScope {
                    detail: format!("{label} vertex {id} not in graph"),
                });
            }
        }

        let mut scope: FxHashSet<VertexId> = match stop {
            Some(stop) => self.closure(stop, Direction::Upstream),
            None => self.index.keys().cloned().collect(),
        };

        if let Some(start) = start {
            scope.extend(self.closure(start, Direction::Upstream));
            if stop.is_none() {
                scope.extend(self.closure(start, Direction::Downstream));
            }
        }

        if scope.is_empty() {
            return Err(GraphError::EmptyScope {
                detail: "graph has no vertices".to_string(),
            });
        }
        Ok(scope)
    }

    /// Transitive closure from `from` (inclusive) walking one direction.
    fn closure(&self, from: &VertexId, direction: Direction) -> FxHashSet<VertexId> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![from.clone()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let next = match direction {
                Direction::Upstream => self.predecessors(&id),
                Direction::Downstream => self.successors(&id),
            };
            stack.extend(next);
        }
        seen
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Upstream,
    Downstream,
}
