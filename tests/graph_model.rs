use loomflow::graph::{Edge, FlowGraph, GraphData, GraphError, Vertex, VertexId};
use serde_json::json;

mod common;
use common::*;

#[test]
fn editor_payload_deserializes_into_a_graph() {
    let payload = json!({
        "vertices": [
            { "id": "ChatInput-XtBLx", "component_type": "ChatInput" },
            {
                "id": "Prompt-k2Fv9",
                "component_type": "Prompt",
                "display_name": "My Prompt",
                "params": { "template": "{message}" }
            }
        ],
        "edges": [
            {
                "source": "ChatInput-XtBLx",
                "source_output": "message",
                "target": "Prompt-k2Fv9",
                "target_input": "message"
            }
        ]
    });

    let data: GraphData = serde_json::from_value(payload).unwrap();
    let graph = FlowGraph::from_data("editor-flow", data).unwrap();
    assert!(graph.validate().is_ok());
    assert_eq!(graph.vertices().len(), 2);

    let prompt = graph.vertex(&VertexId::from("Prompt-k2Fv9")).unwrap();
    assert_eq!(prompt.display_name, "My Prompt");
    assert_eq!(prompt.params["template"], json!("{message}"));
}

#[test]
fn scope_with_both_boundaries_unions_start_ancestors() {
    // In -> Prompt -> Model -> Out, plus a side branch Side -> Model2 that
    // feeds nothing in the stop closure.
    let graph = chain_graph("both-bounds");
    let scope = graph
        .scope(
            Some(&VertexId::from("Prompt-bbbbb")),
            Some(&VertexId::from("Model-ccccc")),
        )
        .unwrap();
    // Stop closure: In, Prompt, Model. Start's ancestors (In) are already
    // inside; the stopped vertex stays excluded.
    assert_eq!(scope.len(), 3);
    assert!(!scope.contains(&VertexId::from("ChatOutput-ddddd")));
}

#[test]
fn validation_is_read_only() {
    let graph = FlowGraph::new("ro")
        .add_vertex(Vertex::with_id("A", "ChatInput"))
        .add_edge(Edge::new("A", "message", "Missing", "input"));
    let before_vertices = graph.vertices().len();
    let before_edges = graph.edges().len();

    assert!(graph.validate().is_err());
    assert_eq!(graph.vertices().len(), before_vertices);
    assert_eq!(graph.edges().len(), before_edges);
}

#[test]
fn self_edge_is_a_cycle() {
    let graph = FlowGraph::new("self")
        .add_vertex(Vertex::with_id("A", "TextConcat"))
        .add_edge(Edge::new("A", "text", "A", "first"));
    assert!(matches!(
        graph.validate(),
        Err(GraphError::Cycle { .. })
    ));
}

#[test]
fn empty_graph_validates_but_cannot_be_scoped() {
    let graph = FlowGraph::new("empty");
    assert!(graph.validate().is_ok());
    assert!(matches!(
        graph.scope(None, None),
        Err(GraphError::EmptyScope { .. })
    ));
}
