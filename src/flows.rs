//! Flow lookup: the narrow interface to the external persistence layer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::graph::FlowGraph;

/// Supplies the graph snapshot for a flow id.
///
/// CRUD storage of flows is an external collaborator; the engine only ever
/// asks for the current snapshot. Build requests may also carry an inline
/// graph, bypassing the store entirely.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn get(&self, flow_id: &str) -> Option<Arc<FlowGraph>>;
}

/// In-memory store for tests, demos, and single-process deployments.
#[derive(Default)]
pub struct MemoryFlowStore {
    flows: Mutex<FxHashMap<String, Arc<FlowGraph>>>,
}

impl MemoryFlowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snapshot under its flow id, replacing any previous one.
    pub fn register(&self, graph: FlowGraph) {
        self.flows
            .lock()
            .expect("flow store poisoned")
            .insert(graph.flow_id().to_string(), Arc::new(graph));
    }

    pub fn remove(&self, flow_id: &str) -> bool {
        self.flows
            .lock()
            .expect("flow store poisoned")
            .remove(flow_id)
            .is_some()
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn get(&self, flow_id: &str) -> Option<Arc<FlowGraph>> {
        self.flows
            .lock()
            .expect("flow store poisoned")
            .get(flow_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_replaces_previous_snapshot() {
        let store = MemoryFlowStore::new();
        store.register(FlowGraph::new("f"));
        let first = store.get("f").await.unwrap();
        store.register(FlowGraph::new("f"));
        let second = store.get("f").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(store.remove("f"));
        assert!(store.get("f").await.is_none());
    }
}
