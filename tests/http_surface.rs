use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::timeout;

use loomflow::config::RuntimeConfig;
use loomflow::flows::MemoryFlowStore;
use loomflow::runs::FlowRunner;
use loomflow::server::{router, AppState};

mod common;
use common::*;

/// Serve the API on an ephemeral port, returning its base URL.
async fn serve() -> (String, Arc<FlowRunner>, Arc<MemoryFlowStore>) {
    let runner = Arc::new(FlowRunner::new(test_registry(), RuntimeConfig::default()));
    let flows = Arc::new(MemoryFlowStore::new());
    let app = router(AppState::new(
        Arc::clone(&runner),
        Arc::clone(&flows) as Arc<dyn loomflow::flows::FlowStore>,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!("test server error: {err:?}");
        }
    });
    (format!("http://{addr}"), runner, flows)
}

fn parse_lines(body: &str) -> Vec<Value> {
    body.lines()
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn build_and_read_full_event_history() {
    let (base, _runner, flows) = serve().await;
    flows.register(chain_graph("stored-flow"));
    let client = Client::new();

    let response = client
        .post(format!("{base}/build/stored-flow/flow"))
        .json(&json!({ "inputs": { "input_value": "over http" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let job: Value = response.json().await.unwrap();
    let job_id = job["job_id"].as_str().unwrap();

    // Scenario: stream=false blocks until terminated, then returns the
    // complete ordered history.
    let body = client
        .get(format!("{base}/build/{job_id}/events?stream=false"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let events = parse_lines(&body);

    assert_eq!(events.first().unwrap()["event"], "vertices_sorted");
    assert_eq!(events.last().unwrap()["event"], "end");
    let ends = events
        .iter()
        .filter(|e| e["event"] == "end_vertex")
        .count();
    assert_eq!(ends, 4);
}

#[tokio::test]
async fn snapshot_requested_before_execution_waits_for_terminal() {
    let (base, runner, flows) = serve().await;
    flows.register(chain_graph("slow-flow"));
    let client = Client::new();

    // A graph whose single vertex takes a while.
    let job: Value = client
        .post(format!("{base}/build/slow-flow/flow"))
        .json(&json!({ "inputs": { "input_value": "wait for me" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let job_id = job["job_id"].as_str().unwrap().to_string();

    let events_body = client
        .get(format!("{base}/build/{job_id}/events?stream=false"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let events = parse_lines(&events_body);
    assert!(
        events
            .last()
            .is_some_and(|e| e["event"] == "end" || e["event"] == "error"),
        "snapshot only returns after a terminal event"
    );
    drop(runner);
}

#[tokio::test]
async fn cyclic_inline_graph_is_rejected_without_a_job_id() {
    let (base, _runner, _flows) = serve().await;
    let client = Client::new();

    let response = client
        .post(format!("{base}/build/inline/flow"))
        .json(&json!({
            "data": {
                "vertices": [
                    { "id": "A", "component_type": "TextConcat" },
                    { "id": "B", "component_type": "TextConcat" }
                ],
                "edges": [
                    { "source": "A", "source_output": "text", "target": "B", "target_input": "first" },
                    { "source": "B", "source_output": "text", "target": "A", "target_input": "first" }
                ]
            }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(
        body["detail"].as_str().unwrap().contains("cycle"),
        "error names the cycle: {body}"
    );
}

#[tokio::test]
async fn unknown_flow_is_404() {
    let (base, _runner, _flows) = serve().await;
    let client = Client::new();
    let response = client
        .post(format!("{base}/build/ghost/flow"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn synchronous_run_returns_the_event_vocabulary() {
    let (base, _runner, flows) = serve().await;
    flows.register(chain_graph("sync-flow"));
    let client = Client::new();

    let body = client
        .post(format!("{base}/run/sync-flow"))
        .json(&json!({ "inputs": { "input_value": "one shot" } }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let events = parse_lines(&body);
    assert_eq!(events.first().unwrap()["event"], "vertices_sorted");
    assert_eq!(events.last().unwrap()["event"], "end");
}

#[tokio::test]
async fn monitor_surfaces_builds_messages_and_transactions() {
    let (base, _runner, flows) = serve().await;
    flows.register(chain_graph("monitored"));
    let client = Client::new();

    // Run once so there is history to inspect.
    client
        .post(format!("{base}/run/monitored"))
        .json(&json!({ "inputs": { "input_value": "hi" }, "session_id": "s-1" }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let builds: Value = client
        .get(format!("{base}/monitor/builds?flow_id=monitored"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(builds["vertex_builds"].as_object().unwrap().len(), 4);

    let messages: Vec<Value> = client
        .get(format!("{base}/monitor/messages?flow_id=monitored&session_id=s-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);

    let message_id = messages[0]["id"].as_str().unwrap();
    let updated = client
        .put(format!("{base}/monitor/messages/{message_id}"))
        .json(&json!({ "text": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), 200);

    let transactions: Vec<Value> = client
        .get(format!("{base}/monitor/transactions?flow_id=monitored"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(transactions.len(), 4);

    let deleted = client
        .delete(format!("{base}/monitor/builds?flow_id=monitored"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);
    let builds_after: Value = client
        .get(format!("{base}/monitor/builds?flow_id=monitored"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(builds_after["vertex_builds"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn cancel_endpoint_terminates_a_streaming_run() {
    let (base, _runner, _flows) = serve().await;
    let client = Client::new();

    let job: Value = client
        .post(format!("{base}/build/inline-slow/flow"))
        .json(&json!({
            "data": {
                "vertices": [{ "id": "Slow-aaaaa", "component_type": "Slow" }],
                "edges": []
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let job_id = job["job_id"].as_str().unwrap().to_string();

    let cancelled = client
        .post(format!("{base}/build/{job_id}/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(cancelled.status(), 200);

    let body = client
        .get(format!("{base}/build/{job_id}/events?stream=false"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let events = parse_lines(&body);
    assert_eq!(events.last().unwrap()["event"], "error");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn live_stream_delivers_ndjson_until_terminal() {
    let (base, _runner, flows) = serve().await;
    flows.register(chain_graph("live-flow"));
    let client = Client::new();

    let job: Value = client
        .post(format!("{base}/build/live-flow/flow"))
        .json(&json!({ "inputs": { "input_value": "live tokens" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let job_id = job["job_id"].as_str().unwrap().to_string();

    let response = client
        .get(format!("{base}/build/{job_id}/events?stream=true"))
        .send()
        .await
        .unwrap();
    let mut body = response.bytes_stream();
    let mut saw_terminal = false;
    while let Some(chunk) = timeout(Duration::from_secs(2), body.next())
        .await
        .ok()
        .flatten()
    {
        let text = String::from_utf8_lossy(&chunk.unwrap()).to_string();
        if text.contains("\"event\":\"end\"") || text.contains("\"event\":\"error\"") {
            saw_terminal = true;
            break;
        }
    }
    assert!(saw_terminal, "stream must end with a terminal event");
}
