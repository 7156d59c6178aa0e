//! API error handling.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::StorageError;

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    /// `Content-Range` for 416 responses.
    content_range: Option<String>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            content_range: None,
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create a payload too large error.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();

        if let Some(range) = self.content_range.and_then(|r| HeaderValue::from_str(&r).ok()) {
            response.headers_mut().insert(header::CONTENT_RANGE, range);
        }

        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(_) => ApiError::bad_request("Invalid path"),
            StorageError::Validation(msg) => ApiError::bad_request(msg),
            StorageError::PathEscapesRoot(path) => {
                tracing::warn!(path = %path, "blocked request outside storage root");
                ApiError::forbidden("Access denied")
            }
            StorageError::NotFound(_) => ApiError::not_found("File not found"),
            StorageError::FileTooLarge { max, .. } => ApiError::payload_too_large(format!(
                "File too large (max {}MB)",
                max / 1024 / 1024
            )),
            StorageError::UnsupportedType(mime) => ApiError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("Unsupported file type: {mime}"),
            ),
            StorageError::InvalidSignature(_) => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "File content does not match its declared type",
            ),
            StorageError::RangeNotSatisfiable { len } => ApiError {
                status: StatusCode::RANGE_NOT_SATISFIABLE,
                message: "Requested range not satisfiable".to_string(),
                content_range: Some(format!("bytes */{len}")),
            },
            err @ (StorageError::Io(_) | StorageError::Mirror(_) | StorageError::Config(_)) => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("Internal server error")
            }
        }
    }
}
