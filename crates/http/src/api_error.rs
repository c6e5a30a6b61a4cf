//! Typed API error for HTTP handlers.
//!
//! Converts service errors and extractor rejections into JSON responses:
//! `{"error": <message>, "detail"?: <string>, "issues"?: [...]}`.

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use voice_study_core::ValidationIssue;
use voice_study_service::ServiceError;
use voice_study_storage::StorageError;

/// API error with HTTP status code and human-readable message.
///
/// `Internal` logs the real error server-side and returns a static message.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with field-level issues.
    Validation(Vec<ValidationIssue>),
    /// 400 for malformed bodies or query strings.
    BadRequest(String),
    /// 404 Not Found.
    NotFound(String),
    /// 500, required backend not configured. The message is safe to expose.
    NotConfigured(String),
    /// 500, unexpected failure. Details logged, not exposed.
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<ValidationIssue>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(issues) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid request".to_owned(),
                    detail: None,
                    issues: Some(issues),
                },
            ),
            Self::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { error: "bad request".to_owned(), detail: Some(detail), issues: None },
            ),
            Self::NotFound(detail) => (
                StatusCode::NOT_FOUND,
                ErrorBody { error: "Not found".to_owned(), detail: Some(detail), issues: None },
            ),
            Self::NotConfigured(message) => {
                tracing::error!(%message, "backend not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { error: message, detail: None, issues: None },
                )
            },
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal server error".to_owned(),
                        detail: None,
                        issues: None,
                    },
                )
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<Vec<ValidationIssue>> for ApiError {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self::Validation(issues)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(issues) => Self::Validation(issues),
            ServiceError::NotFound { entity, id }
            | ServiceError::Storage(StorageError::NotFound { entity, id }) => {
                Self::NotFound(format!("{entity} '{id}' not found"))
            },
            ServiceError::NotConfigured(msg) => Self::NotConfigured(msg),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}
