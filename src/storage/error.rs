//! Errors of the storage leaf, and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// # Errors produced by the storage backend and server.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested file or directory does not exist (or cannot be read).
    #[error("404 {path}: {source}")]
    NotFound {
        /// Requested path, relative to the storage root.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The request path escapes the storage root.
    #[error("invalid path {path:?}")]
    InvalidPath {
        /// Offending request path.
        path: String,
    },

    /// The HTTP method is not one of GET, PUT, DELETE.
    #[error("method {method} is not supported")]
    MethodNotAllowed {
        /// Rejected method.
        method: String,
    },

    /// Any other I/O failure.
    #[error("500 {0}")]
    Io(#[from] std::io::Error),

    /// The listener could not be bound.
    #[error("cannot start listener on {address}: {source}")]
    Bind {
        /// Requested `address:port`.
        address: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl StorageError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StorageError::NotFound { .. } => "storage_not_found",
            StorageError::InvalidPath { .. } => "storage_invalid_path",
            StorageError::MethodNotAllowed { .. } => "storage_method_not_allowed",
            StorageError::Io(_) => "storage_io",
            StorageError::Bind { .. } => "storage_bind",
        }
    }

    /// HTTP status this error is served with.
    pub fn status(&self) -> StatusCode {
        match self {
            StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
            StorageError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
            StorageError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            StorageError::Io(_) | StorageError::Bind { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
