//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use credo_core::CredoError;

/// An error response carrying the status code and a `detail` message body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }
}

impl From<CredoError> for ApiError {
    fn from(err: CredoError) -> Self {
        let status = match &err {
            CredoError::NotFound { .. } => StatusCode::NOT_FOUND,
            CredoError::Auth(_) => StatusCode::UNAUTHORIZED,
            CredoError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CredoError::Extraction(_) | CredoError::Gateway(_) => StatusCode::BAD_GATEWAY,
            CredoError::Transport(_) => StatusCode::BAD_REQUEST,
            CredoError::Io { .. }
            | CredoError::Serialization { .. }
            | CredoError::Config(_)
            | CredoError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
