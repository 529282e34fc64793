//! Receiver error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ops::FieldError;

/// Ways a request can be refused before anything is queued.
#[derive(Debug)]
pub enum ReceiverError {
    /// Body or field validation failed.
    Field(FieldError),
    /// No route for the path.
    NotFound(String),
    /// The bridge is shutting down.
    Stopping,
}

impl From<FieldError> for ReceiverError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

impl IntoResponse for ReceiverError {
    fn into_response(self) -> Response {
        match self {
            // A missing required field is the client's fault and gets JSON;
            // anything else that fails to parse is answered as plain text.
            Self::Field(e @ FieldError::Missing(_)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response(),
            Self::Field(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
            Self::NotFound(path) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": "Not Found", "path": path })),
            )
                .into_response(),
            Self::Stopping => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "error": "Bridge is stopping" })),
            )
                .into_response(),
        }
    }
}
