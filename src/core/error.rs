// Centralized error handling for the sync server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the sync scheduler and its reconciliation passes.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync service is already running")]
    AlreadyStarted,

    #[error("A sync pass is already in progress")]
    AlreadyRunning,

    #[error("Failed to fetch torrents from daemon: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("Daemon snapshot fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    #[error("Sync pass cancelled by shutdown")]
    Cancelled,

    #[error("Record store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Errors surfaced through the HTTP API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("A sync pass is already in progress")]
    SyncInProgress,

    #[error("Daemon request failed: {0}")]
    DaemonError(String),

    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::AlreadyStarted | SyncError::AlreadyRunning => ApiError::SyncInProgress,
            SyncError::Store(source) => ApiError::InternalError(source.to_string()),
            other => ApiError::SyncFailed(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use crate::models::api::ErrorResponse;
        use axum::response::Json;

        let (status, error_message) = match &self {
            ApiError::InvalidApiKey => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::SyncInProgress => (StatusCode::CONFLICT, self.to_string()),
            ApiError::DaemonError(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ApiError::SyncFailed(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: error_message,
            }),
        )
            .into_response()
    }
}
