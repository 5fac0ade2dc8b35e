//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body of the form
//! `{"error": "..."}` with a matching status code.
//!
//! Store and internal failures are logged in full, but callers only see a
//! generic message so paths and SQL never leak.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cadvault_core::{BlobError, ImportError, LibraryError, StoreError, ValidationError, ViewerError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The model file exists but could not be turned into a scene.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// File storage or a remote host failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
            ServerError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            ServerError::Upstream(m) => (StatusCode::BAD_GATEWAY, m.clone()),
            ServerError::Database(m) => {
                error!(error = %m, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<ValidationError> for ServerError {
    fn from(e: ValidationError) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ServerError::NotFound(format!("geometry {id} not found")),
            other => ServerError::Database(other.to_string()),
        }
    }
}

impl From<BlobError> for ServerError {
    fn from(e: BlobError) -> Self {
        warn!(error = %e, "blob store error");
        match e {
            BlobError::InvalidName(name) => ServerError::BadRequest(format!("invalid file name `{name}`")),
            BlobError::Missing(path) => ServerError::NotFound(format!("no file at {path}")),
            refused @ (BlobError::TooLarge { .. }
            | BlobError::UnsupportedUrl(_)
            | BlobError::RemoteFetchDisabled(_)) => ServerError::Unprocessable(refused.to_string()),
            _ => ServerError::Upstream("file storage error".to_owned()),
        }
    }
}

impl From<LibraryError> for ServerError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::Validation(e) => e.into(),
            LibraryError::Store(e) => e.into(),
            LibraryError::Blob(e) => e.into(),
        }
    }
}

impl From<ImportError> for ServerError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::Validation(e) => e.into(),
            ImportError::Create(e) => e.into(),
            ImportError::Upload { geometry_id, source } => {
                warn!(%geometry_id, error = %source, "upload failed, record left pending");
                ServerError::Upstream(format!("upload failed; record {geometry_id} left pending"))
            }
            ImportError::Finalize { geometry_id, source } => {
                ServerError::Database(format!("finalising {geometry_id}: {source}"))
            }
        }
    }
}

impl From<ViewerError> for ServerError {
    fn from(e: ViewerError) -> Self {
        match e {
            ViewerError::Fetch(e) => e.into(),
            other => ServerError::Unprocessable(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}
