//! Error-to-response mapping
//!
//! Service errors cross the HTTP boundary as status codes and generic
//! bodies; implementation detail (crypto failures, database messages,
//! stack context) stays on the server log.

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use tracing::error;

use strongbox_service::{FieldError, ServiceError};

/// HTTP-surface error.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Request body failed to parse or validate before reaching a service
    BadRequest(Vec<FieldError>),
    RateLimited,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Service(ServiceError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                json!({ "errors": errors }),
            ),
            Self::BadRequest(errors) => (StatusCode::BAD_REQUEST, json!({ "errors": errors })),
            Self::Service(ServiceError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Invalid email or password" }),
            ),
            Self::Service(ServiceError::Unauthenticated { expired }) => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "Authentication required",
                    "code": if expired { "TOKEN_EXPIRED" } else { "TOKEN_INVALID" },
                }),
            ),
            Self::Service(ServiceError::Forbidden) => {
                (StatusCode::FORBIDDEN, json!({ "error": "Forbidden" }))
            }
            Self::Service(ServiceError::NotFound) => {
                (StatusCode::NOT_FOUND, json!({ "error": "Not found" }))
            }
            Self::Service(ServiceError::Conflict(message)) => {
                (StatusCode::CONFLICT, json!({ "error": message }))
            }
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "Too many requests, slow down" }),
            ),
            Self::Service(err @ (ServiceError::Crypto(_) | ServiceError::Internal(_))) => {
                error!(%err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
