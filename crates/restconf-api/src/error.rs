//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use restconf_core::RestconfError;
use serde::Serialize;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request (undecodable path, bad segment grammar, bad body)
    BadRequest(String),
    /// 404 Not Found
    NotFound(String),
    /// 409 Conflict (create of an existing node)
    Conflict(String),
    /// 410 Gone (stream sink closed)
    Gone(String),
    /// 503 Service Unavailable (no stream worker left)
    ServiceUnavailable(String),
    /// 500 Internal Server Error
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::Conflict(msg) => ("conflict", msg),
            ApiError::Gone(msg) => ("gone", msg),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg),
            ApiError::Internal(msg) => ("internal_error", msg),
        };

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "API error");
        } else if status.is_client_error() {
            tracing::debug!(error = error_type, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<RestconfError> for ApiError {
    fn from(err: RestconfError) -> Self {
        let message = err.to_string();
        match err {
            RestconfError::Decode { .. }
            | RestconfError::MalformedSegment { .. }
            | RestconfError::NotADataResource(_)
            | RestconfError::UnsupportedNodeType { .. } => ApiError::BadRequest(message),
            RestconfError::NotFound(_) => ApiError::NotFound(message),
            RestconfError::Conflict(_) => ApiError::Conflict(message),
            RestconfError::SinkClosed => ApiError::Gone(message),
            RestconfError::PoolExhausted { .. } => ApiError::ServiceUnavailable(message),
            RestconfError::TreeEngineFailure(_) | RestconfError::Internal(_) => {
                ApiError::Internal(message)
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", err))
    }
}
