//! JSON error bodies shared by every handler: `{ "error", "message" }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use wp_channels::ResolutionError;
use wp_domain::error::DirectoryError;

/// Build a standardized JSON error response.
pub fn api_error(status: StatusCode, kind: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": kind, "message": message.into() })),
    )
        .into_response()
}

/// HTTP status for a resolution failure.
pub fn resolution_status(e: &ResolutionError) -> StatusCode {
    match e {
        ResolutionError::NoSuchSession { .. } => StatusCode::NOT_FOUND,
        ResolutionError::InvalidMetadata(_) => StatusCode::BAD_REQUEST,
        ResolutionError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ResolutionError::ExhaustedSuffixes { .. } => StatusCode::CONFLICT,
        ResolutionError::Directory(_) => StatusCode::BAD_GATEWAY,
    }
}

pub fn resolution_error(e: &ResolutionError) -> Response {
    let status = resolution_status(e);
    if status.is_server_error() {
        tracing::warn!(kind = e.kind(), error = %e, "channel request failed");
    }
    api_error(status, e.kind(), e.to_string())
}

/// Map a raw directory failure (admin and cron paths).
pub fn directory_error(e: &DirectoryError) -> Response {
    let status = match e {
        DirectoryError::NotFound { .. } => StatusCode::NOT_FOUND,
        DirectoryError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        DirectoryError::AlreadyExists { .. } => StatusCode::CONFLICT,
        DirectoryError::Rejected { .. } => StatusCode::BAD_GATEWAY,
    };
    api_error(status, e.kind(), e.to_string())
}
