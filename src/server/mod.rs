//! The HTTP run surface.
//!
//! Exposes the engine over axum:
//!
//! - `POST /build/{flow_id}/flow` → `{job_id}`
//! - `GET  /build/{job_id}/events?stream={true|false}` → NDJSON events
//! - `POST /build/{job_id}/cancel`
//! - `POST /run/{flow_id}?stream={true|false}` (synchronous surface)
//! - `GET|DELETE /monitor/builds?flow_id=`
//! - `GET|DELETE /monitor/messages`, `PUT /monitor/messages/{message_id}`
//! - `GET  /monitor/transactions?flow_id=`
//! - `GET  /health`
//!
//! Every event line is one JSON object shaped `{"event": kind, "data":
//! payload}`; streams always end with a terminal `end` or `error` line.

mod build;
mod error;
mod monitor;
mod run;

pub use build::{BuildRequest, BuildResponse, NDJSON};
pub use error::ApiError;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::flows::FlowStore;
use crate::runs::FlowRunner;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<FlowRunner>,
    pub flows: Arc<dyn FlowStore>,
}

impl AppState {
    #[must_use]
    pub fn new(runner: Arc<FlowRunner>, flows: Arc<dyn FlowStore>) -> Self {
        Self { runner, flows }
    }
}

/// Build the full API router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/build/{flow_id}/flow", post(build::start_flow_build))
        .route("/build/{job_id}/events", get(build::build_events))
        .route("/build/{job_id}/cancel", post(build::cancel_build))
        .route("/run/{flow_id}", post(run::run_flow))
        .route(
            "/monitor/builds",
            get(monitor::list_builds).delete(monitor::delete_builds),
        )
        .route(
            "/monitor/messages",
            get(monitor::list_messages).delete(monitor::delete_messages),
        )
        .route("/monitor/messages/{message_id}", put(monitor::update_message))
        .route("/monitor/transactions", get(monitor::list_transactions))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
