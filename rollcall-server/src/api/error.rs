//! API error type and its HTTP mapping
//!
//! Every error body is `{"error": ..., "details"?: ...}`. Storage that cannot
//! be reached maps to 503 so scanner devices can tell "server unreachable"
//! apart from "request rejected".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rollcall_common::api::ErrorResponse;
use tracing::{error, warn};

/// Handler errors
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or incomplete request (400)
    BadRequest(String),
    /// Record does not exist (404)
    NotFound(String),
    /// Storage unreachable (503)
    Unavailable { error: String, details: String },
    /// Anything else (500)
    Internal(String),
}

impl ApiError {
    /// Wrap a storage error, naming the operation that failed
    pub fn storage(operation: &str, err: rollcall_common::Error) -> Self {
        match err {
            rollcall_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            rollcall_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            e if e.is_unavailable() => ApiError::Unavailable {
                error: operation.to_string(),
                details: format!("Cannot connect to storage: {}", e),
            },
            e => ApiError::Internal(format!("{}: {}", operation, e)),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => ErrorResponse::new(msg),
            ApiError::Unavailable { error, details } => {
                warn!("{}: {}", error, details);
                ErrorResponse::new(error).with_details(details)
            }
            ApiError::Internal(msg) => {
                error!("{}", msg);
                ErrorResponse::new(msg)
            }
        };

        (status, Json(body)).into_response()
    }
}
