//! Monitor surface: build history and audit records.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::monitor::{MessageRecord, TransactionRecord};

#[derive(Debug, Deserialize)]
pub struct FlowQuery {
    pub flow_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub flow_id: Option<String>,
    pub session_id: Option<String>,
}

/// `GET /monitor/builds?flow_id=`: full build history for a flow, keyed
/// by vertex id.
pub async fn list_builds(
    State(state): State<AppState>,
    Query(query): Query<FlowQuery>,
) -> Json<Value> {
    let builds = state.runner.cache().list(&query.flow_id);
    Json(json!({ "vertex_builds": builds }))
}

/// `DELETE /monitor/builds?flow_id=`: drop a flow's build history.
pub async fn delete_builds(
    State(state): State<AppState>,
    Query(query): Query<FlowQuery>,
) -> Json<Value> {
    state.runner.cache().clear(&query.flow_id);
    Json(json!({ "deleted": true }))
}

/// `GET /monitor/messages?flow_id=&session_id=`: recorded chat turns.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Json<Vec<MessageRecord>> {
    Json(
        state
            .runner
            .monitor()
            .messages(query.flow_id.as_deref(), query.session_id.as_deref()),
    )
}

/// `DELETE /monitor/messages?flow_id=`: drop a flow's chat turns.
pub async fn delete_messages(
    State(state): State<AppState>,
    Query(query): Query<FlowQuery>,
) -> Json<Value> {
    let deleted = state.runner.monitor().delete_messages(&query.flow_id);
    Json(json!({ "deleted": deleted }))
}

#[derive(Debug, Deserialize)]
pub struct MessageUpdate {
    pub text: String,
}

/// `PUT /monitor/messages/{message_id}`: edit a recorded turn's text.
pub async fn update_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(update): Json<MessageUpdate>,
) -> Result<Json<Value>, ApiError> {
    if state.runner.monitor().update_message(&message_id, &update.text) {
        Ok(Json(json!({ "updated": true })))
    } else {
        Err(ApiError::not_found(format!(
            "unknown message: {message_id}"
        )))
    }
}

/// `GET /monitor/transactions?flow_id=`: per-execution audit records.
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<FlowQuery>,
) -> Json<Vec<TransactionRecord>> {
    Json(state.runner.monitor().transactions(Some(&query.flow_id)))
}
