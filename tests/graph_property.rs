//! Property tests for the dependency resolver.

use proptest::prelude::*;
use rustc_hash::FxHashSet;

use loomflow::graph::{resolver, Edge, FlowGraph, Vertex, VertexId};

/// A random DAG: `n` vertices, edges only from lower to higher creation
/// index, so acyclicity holds by construction. Each target input slot name
/// is unique per edge, respecting the one-edge-per-slot invariant.
fn dag_strategy() -> impl Strategy<Value = FlowGraph> {
    (2usize..10).prop_flat_map(|n| {
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        let count = pairs.len();
        prop::collection::vec(any::<bool>(), count).prop_map(move |included| {
            let mut graph = FlowGraph::new("prop");
            for i in 0..n {
                graph = graph.add_vertex(Vertex::with_id(format!("V{i}"), "TextConcat"));
            }
            for (keep, (i, j)) in included.iter().zip(&pairs) {
                if *keep {
                    graph = graph.add_edge(Edge::new(
                        format!("V{i}"),
                        "text",
                        format!("V{j}"),
                        format!("in_{i}_{j}"),
                    ));
                }
            }
            graph
        })
    })
}

fn full_scope(graph: &FlowGraph) -> FxHashSet<VertexId> {
    graph.vertices().iter().map(|v| v.id.clone()).collect()
}

proptest! {
    /// Every vertex appears after all of its in-scope predecessors.
    #[test]
    fn order_is_topological(graph in dag_strategy()) {
        let scope = full_scope(&graph);
        let order = resolver::order(&graph, &scope).unwrap();
        prop_assert_eq!(order.len(), scope.len());

        let position: std::collections::HashMap<&VertexId, usize> =
            order.iter().enumerate().map(|(i, id)| (id, i)).collect();
        for edge in graph.edges() {
            prop_assert!(position[&edge.source] < position[&edge.target]);
        }
    }

    /// Repeated calls on an unchanged (graph, scope) yield the identical
    /// sequence.
    #[test]
    fn order_is_deterministic(graph in dag_strategy()) {
        let scope = full_scope(&graph);
        let first = resolver::order(&graph, &scope).unwrap();
        for _ in 0..5 {
            prop_assert_eq!(resolver::order(&graph, &scope).unwrap(), first.clone());
        }
    }

    /// A stop boundary keeps exactly the stop vertex and its ancestors, and
    /// ordering the scoped subset stays valid.
    #[test]
    fn stop_scope_orders_ancestors_only(graph in dag_strategy(), pick in any::<prop::sample::Index>()) {
        let stop = pick.get(graph.vertices()).id.clone();
        let scope = graph.scope(None, Some(&stop)).unwrap();
        prop_assert!(scope.contains(&stop));

        let order = resolver::order(&graph, &scope).unwrap();
        prop_assert_eq!(order.len(), scope.len());
        prop_assert_eq!(order.last().unwrap(), &stop);

        // Everything in scope reaches the stop vertex.
        for id in &scope {
            let mut stack = vec![id.clone()];
            let mut seen = FxHashSet::default();
            let mut reaches = false;
            while let Some(current) = stack.pop() {
                if current == stop {
                    reaches = true;
                    break;
                }
                if seen.insert(current.clone()) {
                    stack.extend(graph.successors(&current));
                }
            }
            prop_assert!(reaches, "{id} is in scope but cannot reach {stop}");
        }
    }

    /// Validation accepts every generated DAG.
    #[test]
    fn generated_dags_validate(graph in dag_strategy()) {
        prop_assert!(graph.validate().is_ok());
    }
}

#[test]
fn reversed_creation_order_still_sorts_topologically() {
    // Declaration order disagrees with dependency order; dependencies win.
    let graph = FlowGraph::new("rev")
        .add_vertex(Vertex::with_id("Late", "TextConcat"))
        .add_vertex(Vertex::with_id("Early", "TextConcat"))
        .add_edge(Edge::new("Early", "text", "Late", "first"));
    let scope = full_scope(&graph);
    let order = resolver::order(&graph, &scope).unwrap();
    assert_eq!(
        order,
        vec![VertexId::from("Early"), VertexId::from("Late")]
    );
}
