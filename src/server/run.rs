//! Synchronous run surface: execute a whole flow in one request.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use futures_util::StreamExt;
use serde::Deserialize;

use super::build::{collect_lines, ndjson_response, resolve_graph, BuildRequest};
use super::error::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    #[serde(default)]
    pub stream: bool,
}

/// `POST /run/{flow_id}?stream={true|false}`: run the full graph to
/// completion with the same event vocabulary as the build surface and no
/// job-id indirection.
///
/// With `stream=true` events are delivered as they are produced, starting
/// at `vertices_sorted`; otherwise the call blocks and returns the complete
/// newline-delimited history.
pub async fn run_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    Query(query): Query<RunQuery>,
    Json(request): Json<BuildRequest>,
) -> Result<Response, ApiError> {
    let data = request.data.clone();
    let graph = resolve_graph(&state, &flow_id, data).await?;

    if query.stream {
        let (_job_id, source) = state
            .runner
            .start_run_streaming(graph, request.into_options())?;
        let lines = source
            .into_stream()
            .map(|event| Ok::<_, Infallible>(event.to_ndjson_line()));
        Ok(ndjson_response(Body::from_stream(lines)))
    } else {
        let events = state
            .runner
            .run_to_completion(graph, request.into_options())
            .await?;
        Ok(ndjson_response(Body::from(collect_lines(&events))))
    }
}
