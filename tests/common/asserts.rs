use loomflow::graph::VertexId;
use loomflow::runs::FlowEvent;

/// Kinds of the given events, in order.
pub fn kinds(events: &[FlowEvent]) -> Vec<&'static str> {
    events.iter().map(FlowEvent::kind).collect()
}

/// The `end_vertex` events, as (vertex id, valid) pairs in order.
pub fn end_vertices(events: &[FlowEvent]) -> Vec<(VertexId, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            FlowEvent::EndVertex { id, valid, .. } => Some((id.clone(), *valid)),
            _ => None,
        })
        .collect()
}

/// The `to_run` listing from the stream's `vertices_sorted` event.
pub fn to_run(events: &[FlowEvent]) -> Vec<VertexId> {
    events
        .iter()
        .find_map(|e| match e {
            FlowEvent::VerticesSorted { to_run, .. } => Some(to_run.clone()),
            _ => None,
        })
        .expect("stream starts with vertices_sorted")
}

pub fn assert_single_terminal(events: &[FlowEvent]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "expected exactly one terminal event");
    assert!(
        events.last().is_some_and(FlowEvent::is_terminal),
        "terminal event must close the stream"
    );
}
