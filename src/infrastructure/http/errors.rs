//! API error types mapped to HTTP status codes.
//!
//! Only downstream failures are errors. A rate limit rejection is a normal
//! outcome answered by the admission middleware and never passes through here.

use crate::application::ports::QueryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Application-level error type that implements `IntoResponse`.
///
/// - `Query` → 500
#[derive(Debug, Error)]
pub enum ApiError {
    /// The route's query could not be executed (500).
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ApiError {
    /// Status code sent to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Cause stays in the log; clients get a generic message
        let message = match &self {
            ApiError::Query(err) => {
                tracing::error!(error = %err, "query failed");
                "query failed"
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
