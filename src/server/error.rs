//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::graph::GraphError;
use crate::runs::RunnerError;
use crate::stream::StreamError;

/// An error rendered as `{"detail": ...}` with an appropriate status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<RunnerError> for ApiError {
    fn from(err: RunnerError) -> Self {
        let status = match &err {
            RunnerError::Graph(_) => StatusCode::BAD_REQUEST,
            RunnerError::UnknownFlow { .. } | RunnerError::UnknownRun { .. } => {
                StatusCode::NOT_FOUND
            }
            RunnerError::Stream(StreamError::UnknownRun { .. }) => StatusCode::NOT_FOUND,
            RunnerError::Stream(StreamError::DuplicateRun { .. }) => StatusCode::CONFLICT,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<StreamError> for ApiError {
    fn from(err: StreamError) -> Self {
        ApiError::from(RunnerError::Stream(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
