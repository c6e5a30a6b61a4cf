//! Typed error enum for the service layer.

use thiserror::Error;
use voice_study_core::ValidationIssue;
use voice_study_storage::StorageError;

use crate::object_store::UploadError;

/// Service-layer error unifying storage and object-storage failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage operation failed (DB, not found, duplicate, etc.).
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Input rejected before anything was written.
    #[error("invalid input: {}", summarize(.0))]
    Validation(Vec<ValidationIssue>),

    /// Referenced record does not exist.
    #[error("not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    /// Object storage upload failed.
    #[error("upload: {0}")]
    Upload(#[from] UploadError),

    /// Required backend (object storage) is not configured.
    #[error("not configured: {0}")]
    NotConfigured(String),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl ServiceError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationIssue { path: path.into(), message: message.into() }])
    }

    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::Upload(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Storage(StorageError::NotFound { .. }))
    }
}
