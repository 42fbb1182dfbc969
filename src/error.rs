//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Guidance attached to every lock or permission failure on a backing file.
pub const LOCK_GUIDANCE: &str = "The file may be:\n\
1. Open in another application (Excel, Notepad, etc.) - please close it\n\
2. Set to read-only - check the file properties and remove the read-only attribute\n\
3. Locked by another process - close that process or restart if needed\n\
4. Blocked by antivirus - check the antivirus settings";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate file name: {0}")]
    DuplicateFileName(String),
    #[error("collection '{collection}': primary key '{column}' is not a declared column")]
    InvalidPrimaryKey { collection: String, column: String },
    #[error("collection '{collection}': {message}")]
    InvalidColumn { collection: String, message: String },
    #[error("collection '{collection}': unknown operation '{operation}'")]
    UnknownOperation { collection: String, operation: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("settings: {0}")]
    Settings(String),
}

/// Failures of the record store. Each carries enough detail for an operator
/// to fix the file or the request without reading logs.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: String, key: String },
    #[error("validation: {0}")]
    Validation(String),
    #[error("permission denied: cannot write to file '{}'. {guidance}", path.display())]
    PermissionDenied { path: PathBuf, guidance: String },
    #[error("cannot access file '{}': {reason}", path.display())]
    Io { path: PathBuf, reason: String },
    #[error("column '{column}' not found in '{}'. Available columns: {available:?}", path.display())]
    MalformedSchema {
        path: PathBuf,
        column: String,
        available: Vec<String>,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &str, key: &str) -> Self {
        StoreError::NotFound {
            entity: entity.to_string(),
            key: key.trim().to_string(),
        }
    }

    pub fn permission_denied(path: &Path) -> Self {
        StoreError::PermissionDenied {
            path: path.to_path_buf(),
            guidance: LOCK_GUIDANCE.to_string(),
        }
    }

    /// Translate a raw I/O error on `path` into the most actionable variant.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::PermissionDenied | ErrorKind::WouldBlock => Self::permission_denied(path),
            ErrorKind::NotFound => {
                let parent_missing = path
                    .parent()
                    .map(|p| !p.as_os_str().is_empty() && !p.exists())
                    .unwrap_or(false);
                let reason = if parent_missing {
                    format!(
                        "directory '{}' does not exist; create it or set DATA_DIR",
                        path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                    )
                } else {
                    err.to_string()
                };
                StoreError::Io {
                    path: path.to_path_buf(),
                    reason,
                }
            }
            _ => StoreError::Io {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
    #[error("{operation} not allowed on {collection}")]
    OperationNotAllowed { collection: String, operation: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Store(e) => match e {
                StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                StoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                StoreError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "permission_denied"),
                StoreError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
                StoreError::MalformedSchema { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
            },
            AppError::UnknownCollection(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::OperationNotAllowed { .. } => (StatusCode::METHOD_NOT_ALLOWED, "operation_not_allowed"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Store(StoreError::MalformedSchema { path, column, available }) => Some(serde_json::json!({
                "path": path.display().to_string(),
                "column": column,
                "available": available,
            })),
            AppError::Store(StoreError::PermissionDenied { path, .. }) => Some(serde_json::json!({
                "path": path.display().to_string(),
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() || status == StatusCode::FORBIDDEN {
            tracing::error!(code, error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
