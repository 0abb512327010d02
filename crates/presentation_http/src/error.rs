//! HTTP error mapping
//!
//! Translates [`ApplicationError`] into a stable JSON error body and the
//! status code its category implies. The webhook handler never uses this —
//! it always returns 200 regardless of what happens underneath.

use application::ApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// HTTP-facing error, carrying the status code its category maps to
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    category: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            category: "bad_request",
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            category: "not_found",
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            category: "auth",
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        let status = match &err {
            ApplicationError::NotFound(_) => StatusCode::NOT_FOUND,
            ApplicationError::RoutingMiss(_) => StatusCode::NOT_FOUND,
            ApplicationError::Dup => StatusCode::CONFLICT,
            ApplicationError::Auth(_) | ApplicationError::CryptoNotReady => StatusCode::UNAUTHORIZED,
            ApplicationError::Permission(_) => StatusCode::FORBIDDEN,
            ApplicationError::Domain(_) | ApplicationError::Invariant(_) | ApplicationError::Config(_) => {
                StatusCode::BAD_REQUEST
            },
            ApplicationError::Endpoint(_) => StatusCode::BAD_GATEWAY,
            ApplicationError::Http(status) => StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            ApplicationError::Llm(_) => StatusCode::BAD_GATEWAY,
            ApplicationError::CryptoTamper(_) | ApplicationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            category: err.category(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.category,
        };
        (self.status, Json(body)).into_response()
    }
}
