//! Dependency resolution: deterministic topological ordering over a scope.

use rustc_hash::{FxHashMap, FxHashSet};

use super::error::GraphError;
use super::model::FlowGraph;
use super::vertex::VertexId;

/// Compute a valid execution order for the in-scope vertices.
///
/// Kahn's algorithm over in-degree counts restricted to `scope`. Ties among
/// simultaneously-ready vertices are broken by creation order within the
/// graph, so repeated calls on the same (graph, scope) return the identical
/// sequence: the `vertices_sorted` listing shown before a run must match
/// what actually executes.
///
/// The full order is produced up front, not incrementally, because the
/// listing is published before any vertex runs. If the ready queue drains
/// while vertices still have unresolved predecessors, those leftovers are
/// the members of a cycle.
pub fn order(graph: &FlowGraph, scope: &FxHashSet<VertexId>) -> Result<Vec<VertexId>, GraphError> {
    if scope.is_empty() {
        return Err(GraphError::EmptyScope {
            detail: "scope selects no vertices".to_string(),
        });
    }

    let mut in_degree: FxHashMap<&VertexId, usize> = scope.iter().map(|id| (id, 0)).collect();
    let mut successors: FxHashMap<&VertexId, Vec<&VertexId>> = FxHashMap::default();
    for edge in graph.edges() {
        if !scope.contains(&edge.source) || !scope.contains(&edge.target) {
            continue;
        }
        *in_degree.entry(&edge.target).or_insert(0) += 1;
        successors.entry(&edge.source).or_default().push(&edge.target);
    }

    let mut ready: Vec<&VertexId> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();
    sort_by_creation(graph, &mut ready);

    let mut result: Vec<VertexId> = Vec::with_capacity(scope.len());
    let mut cursor = 0;
    while cursor < ready.len() {
        let id = ready[cursor];
        cursor += 1;
        result.push(id.clone());

        let Some(next) = successors.get(id) else {
            continue;
        };
        let mut unlocked: Vec<&VertexId> = Vec::new();
        for &succ in next {
            let deg = in_degree
                .get_mut(succ)
                .expect("in-scope successor has a degree entry");
            *deg -= 1;
            if *deg == 0 {
                unlocked.push(succ);
            }
        }
        sort_by_creation(graph, &mut unlocked);
        ready.extend(unlocked);
    }

    if result.len() < scope.len() {
        let mut vertices: Vec<VertexId> = in_degree
            .into_iter()
            .filter(|(_, deg)| *deg > 0)
            .map(|(id, _)| id.clone())
            .collect();
        vertices.sort_by_key(|id| graph.creation_index(id));
        return Err(GraphError::Cycle { vertices });
    }
    Ok(result)
}

/// The in-scope vertices with no in-scope predecessors: the set that is
/// ready to start first, listed in creation order.
#[must_use]
pub fn roots(graph: &FlowGraph, scope: &FxHashSet<VertexId>) -> Vec<VertexId> {
    let mut blocked: FxHashSet<&VertexId> = FxHashSet::default();
    for edge in graph.edges() {
        if scope.contains(&edge.source) && scope.contains(&edge.target) {
            blocked.insert(&edge.target);
        }
    }
    let mut ids: Vec<&VertexId> = scope.iter().filter(|id| !blocked.contains(id)).collect();
    sort_by_creation(graph, &mut ids);
    ids.into_iter().cloned().collect()
}

fn sort_by_creation(graph: &FlowGraph, ids: &mut [&VertexId]) {
    ids.sort_by_key(|id| graph.creation_index(id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Vertex};

    fn scope_of(graph: &FlowGraph) -> FxHashSet<VertexId> {
        graph.vertices().iter().map(|v| v.id.clone()).collect()
    }

    fn chain() -> FlowGraph {
        FlowGraph::new("chain")
            .add_vertex(Vertex::with_id("In", "ChatInput"))
            .add_vertex(Vertex::with_id("Prompt", "Prompt"))
            .add_vertex(Vertex::with_id("Model", "LanguageModel"))
            .add_vertex(Vertex::with_id("Out", "ChatOutput"))
            .add_edge(Edge::new("In", "message", "Prompt", "message"))
            .add_edge(Edge::new("Prompt", "prompt", "Model", "prompt"))
            .add_edge(Edge::new("Model", "message", "Out", "message"))
    }

    #[test]
    fn linear_chain_orders_by_dependency() {
        let graph = chain();
        let order = order(&graph, &scope_of(&graph)).unwrap();
        let ids: Vec<&str> = order.iter().map(VertexId::as_str).collect();
        assert_eq!(ids, vec!["In", "Prompt", "Model", "Out"]);
    }

    #[test]
    fn ties_break_by_creation_order() {
        // Z added before A; both are roots feeding Sink.
        let graph = FlowGraph::new("ties")
            .add_vertex(Vertex::with_id("Z", "ChatInput"))
            .add_vertex(Vertex::with_id("A", "ChatInput"))
            .add_vertex(Vertex::with_id("Sink", "TextConcat"))
            .add_edge(Edge::new("Z", "message", "Sink", "first"))
            .add_edge(Edge::new("A", "message", "Sink", "second"));
        let order = order(&graph, &scope_of(&graph)).unwrap();
        let ids: Vec<&str> = order.iter().map(VertexId::as_str).collect();
        assert_eq!(ids, vec!["Z", "A", "Sink"]);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let graph = chain();
        let scope = scope_of(&graph);
        let first = order(&graph, &scope).unwrap();
        for _ in 0..10 {
            assert_eq!(order(&graph, &scope).unwrap(), first);
        }
    }

    #[test]
    fn scope_restricts_the_order() {
        let graph = chain();
        let scope = graph.scope(None, Some(&"Model".into())).unwrap();
        let order = order(&graph, &scope).unwrap();
        let ids: Vec<&str> = order.iter().map(VertexId::as_str).collect();
        assert_eq!(ids, vec!["In", "Prompt", "Model"]);
    }

    #[test]
    fn empty_scope_is_an_error() {
        let graph = chain();
        let empty = FxHashSet::default();
        assert!(matches!(
            order(&graph, &empty),
            Err(GraphError::EmptyScope { .. })
        ));
    }

    #[test]
    fn cycle_reports_members() {
        let graph = FlowGraph::new("cyc")
            .add_vertex(Vertex::with_id("Root", "ChatInput"))
            .add_vertex(Vertex::with_id("A", "TextConcat"))
            .add_vertex(Vertex::with_id("B", "TextConcat"))
            .add_edge(Edge::new("Root", "message", "A", "first"))
            .add_edge(Edge::new("A", "text", "B", "first"))
            .add_edge(Edge::new("B", "text", "A", "second"));
        match order(&graph, &scope_of(&graph)) {
            Err(GraphError::Cycle { vertices }) => {
                let ids: Vec<&str> = vertices.iter().map(VertexId::as_str).collect();
                assert_eq!(ids, vec!["A", "B"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn roots_lists_scope_entry_points() {
        let graph = chain();
        let full = scope_of(&graph);
        assert_eq!(roots(&graph, &full), vec![VertexId::from("In")]);

        // Scoped to Model and Out only: Model has no in-scope predecessor.
        let partial: FxHashSet<VertexId> =
            [VertexId::from("Model"), VertexId::from("Out")].into_iter().collect();
        assert_eq!(roots(&graph, &partial), vec![VertexId::from("Model")]);
    }
}
