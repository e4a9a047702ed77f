//! Build surface: start runs, read event streams, cancel.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::graph::{FlowGraph, GraphData, VertexId};
use crate::runs::{FlowEvent, RunOptions, RunnerError};

pub const NDJSON: &str = "application/x-ndjson";

/// Body of `POST /build/{flow_id}/flow`.
#[derive(Debug, Default, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub inputs: FxHashMap<String, Value>,
    /// Inline graph snapshot; when present it supersedes the stored flow.
    #[serde(default)]
    pub data: Option<GraphData>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub start_component_id: Option<VertexId>,
    #[serde(default)]
    pub stop_component_id: Option<VertexId>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_log_builds")]
    pub log_builds: bool,
}

fn default_log_builds() -> bool {
    true
}

impl BuildRequest {
    pub fn into_options(self) -> RunOptions {
        RunOptions {
            session_id: self.session_id,
            start_vertex: self.start_component_id,
            stop_vertex: self.stop_component_id,
            inputs: self.inputs,
            overrides: FxHashMap::default(),
            files: self.files,
            log_builds: self.log_builds,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BuildResponse {
    pub job_id: String,
}

/// Resolve the graph snapshot for a request: inline `data` wins, otherwise
/// the flow store supplies it.
pub(super) async fn resolve_graph(
    state: &AppState,
    flow_id: &str,
    data: Option<GraphData>,
) -> Result<Arc<FlowGraph>, ApiError> {
    match data {
        Some(data) => Ok(Arc::new(FlowGraph::from_data(flow_id, data)?)),
        None => state
            .flows
            .get(flow_id)
            .await
            .ok_or_else(|| {
                ApiError::from(RunnerError::UnknownFlow {
                    flow_id: flow_id.to_string(),
                })
            }),
    }
}

/// `POST /build/{flow_id}/flow`: start a run, returning its job id.
/// Graph errors fail here with 400; no job id is issued.
pub async fn start_flow_build(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    Json(request): Json<BuildRequest>,
) -> Result<Json<BuildResponse>, ApiError> {
    let data = request.data.clone();
    let graph = resolve_graph(&state, &flow_id, data).await?;
    let job_id = state.runner.start_run(graph, request.into_options())?;
    Ok(Json(BuildResponse { job_id }))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

/// `GET /build/{job_id}/events?stream={true|false}`: newline-delimited
/// JSON events, terminated by `end` or `error`.
///
/// Live mode delivers from the subscriber's join point; `stream=false`
/// blocks until the run terminated and returns the complete history.
pub async fn build_events(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Response, ApiError> {
    let publisher = state.runner.publisher();
    if query.stream {
        let source = publisher.subscribe(&job_id)?;
        let lines = source
            .into_stream()
            .map(|event| Ok::<_, Infallible>(event.to_ndjson_line()));
        Ok(ndjson_response(Body::from_stream(lines)))
    } else {
        let events = publisher.snapshot(&job_id).await?;
        Ok(ndjson_response(Body::from(collect_lines(&events))))
    }
}

/// `POST /build/{job_id}/cancel`: request cooperative cancellation.
pub async fn cancel_build(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.runner.cancel_run(&job_id)?;
    Ok(Json(json!({ "cancelled": true })))
}

pub(super) fn ndjson_response(body: Body) -> Response {
    ([(header::CONTENT_TYPE, NDJSON)], body).into_response()
}

pub(super) fn collect_lines(events: &[FlowEvent]) -> String {
    events.iter().map(FlowEvent::to_ndjson_line).collect()
}
