use std::sync::Arc;

use loomflow::component::ComponentRegistry;
use loomflow::config::RuntimeConfig;
use loomflow::graph::{Edge, FlowGraph, Vertex};
use loomflow::runs::FlowRunner;
use serde_json::json;

use super::components::{FailingComponent, SlowComponent};

/// The canonical linear chain: ChatInput -> Prompt -> Model -> ChatOutput.
pub fn chain_graph(flow_id: &str) -> FlowGraph {
    FlowGraph::new(flow_id)
        .add_vertex(Vertex::with_id("ChatInput-aaaaa", "ChatInput"))
        .add_vertex(
            Vertex::with_id("Prompt-bbbbb", "Prompt").with_param("template", json!("{message}")),
        )
        .add_vertex(Vertex::with_id("Model-ccccc", "LanguageModel"))
        .add_vertex(Vertex::with_id("ChatOutput-ddddd", "ChatOutput"))
        .add_edge(Edge::new(
            "ChatInput-aaaaa",
            "message",
            "Prompt-bbbbb",
            "message",
        ))
        .add_edge(Edge::new("Prompt-bbbbb", "prompt", "Model-ccccc", "prompt"))
        .add_edge(Edge::new(
            "Model-ccccc",
            "message",
            "ChatOutput-ddddd",
            "message",
        ))
}

/// Same chain but the model vertex uses a component that always fails.
pub fn chain_graph_with_failing_model(flow_id: &str) -> FlowGraph {
    FlowGraph::new(flow_id)
        .add_vertex(Vertex::with_id("ChatInput-aaaaa", "ChatInput"))
        .add_vertex(
            Vertex::with_id("Prompt-bbbbb", "Prompt").with_param("template", json!("{message}")),
        )
        .add_vertex(Vertex::with_id("Model-ccccc", "BrokenModel"))
        .add_vertex(Vertex::with_id("ChatOutput-ddddd", "ChatOutput"))
        .add_edge(Edge::new(
            "ChatInput-aaaaa",
            "message",
            "Prompt-bbbbb",
            "message",
        ))
        .add_edge(Edge::new("Prompt-bbbbb", "prompt", "Model-ccccc", "input"))
        .add_edge(Edge::new(
            "Model-ccccc",
            "output",
            "ChatOutput-ddddd",
            "message",
        ))
}

/// Two independent branches from two roots into separate outputs.
pub fn two_branch_graph(flow_id: &str) -> FlowGraph {
    FlowGraph::new(flow_id)
        .add_vertex(Vertex::with_id("In-aaaaa", "ChatInput"))
        .add_vertex(Vertex::with_id("Broken-bbbbb", "Broken"))
        .add_vertex(Vertex::with_id("OutA-ccccc", "ChatOutput"))
        .add_vertex(Vertex::with_id("OutB-ddddd", "ChatOutput"))
        .add_edge(Edge::new("In-aaaaa", "message", "OutA-ccccc", "message"))
        .add_edge(Edge::new("Broken-bbbbb", "output", "OutB-ddddd", "message"))
}

/// Registry with the built-ins plus the test components.
pub fn test_registry() -> Arc<ComponentRegistry> {
    Arc::new(
        ComponentRegistry::with_builtins()
            .register("Broken", FailingComponent::vertex_local("broken component"))
            .register("BrokenModel", FailingComponent::vertex_local("model exploded"))
            .register("FatalModel", FailingComponent::fatal("provider outage"))
            .register(
                "Slow",
                SlowComponent {
                    total: std::time::Duration::from_millis(500),
                },
            ),
    )
}

pub fn test_runner() -> FlowRunner {
    FlowRunner::new(test_registry(), RuntimeConfig::default())
}
