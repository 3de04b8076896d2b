//! Error types for logscope
//!
//! Provides unified error handling using thiserror. Cache operations never
//! fail; these errors come from the watcher and the admin surface.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Logscope Error Enum ==
/// Unified error type for the watcher and admin surface.
#[derive(Error, Debug)]
pub enum LogscopeError {
    /// The watcher dispatch loop is already running
    #[error("Watcher is already running")]
    AlreadyRunning,

    /// A path could not be turned into an absolute path
    #[error("Cannot resolve path {path}: {source}")]
    ResolvePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS-level watch could not be installed
    #[error("Cannot watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The OS notification backend could not be created
    #[error("File watcher backend failed: {0}")]
    Backend(#[source] notify::Error),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for LogscopeError {
    fn into_response(self) -> Response {
        let status = match &self {
            LogscopeError::AlreadyRunning => StatusCode::CONFLICT,
            LogscopeError::ResolvePath { .. } | LogscopeError::Watch { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            LogscopeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            LogscopeError::Backend(_) | LogscopeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for logscope.
pub type Result<T> = std::result::Result<T, LogscopeError>;
