//! API error types and JSON error response formatting.
//!
//! Every failure leaves the service as `{error, message}` with a matching
//! HTTP status, so the dashboard can branch on the machine-readable code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use hotspot_core::HotspotError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - malformed batch or unknown query.
    BadRequest(String),
    /// 404 Not Found - no such route.
    NotFound(String),
    /// 413 Payload Too Large - body over the configured limit.
    PayloadTooLarge(String),
    /// 429 Too Many Requests - per-second rate limit hit.
    TooManyRequests(String),
    /// 500 Internal Server Error - store failure.
    Internal(String),
    /// 503 Service Unavailable - store lock poisoned.
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::TooManyRequests(_) => "too_many_requests",
            ApiError::Internal(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code().to_string();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::Internal(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

impl From<HotspotError> for ApiError {
    fn from(err: HotspotError) -> Self {
        match err {
            HotspotError::InvalidBatch(msg) => ApiError::BadRequest(msg),
            HotspotError::Serialization(msg) => ApiError::BadRequest(msg),
            HotspotError::Storage(msg) if msg.contains("poisoned") => {
                ApiError::ServiceUnavailable(msg)
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
