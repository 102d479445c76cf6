//! Admin API error envelope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::directory::DirectoryError;
use crate::queue::QueueError;
use crate::storage::DatabaseError;

/// Rendered as `{"success": false, "message": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Server configuration error: ADMIN_API_KEY not set")]
    NotConfigured,

    #[error("Internal Server Error")]
    Internal,
}

impl AdminError {
    pub fn device_not_found(sn: &str) -> Self {
        Self::NotFound(format!("Device not found: {sn}"))
    }

    pub fn missing(param: &str) -> Self {
        Self::BadRequest(format!("Missing required parameter: {param}"))
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotConfigured | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<DatabaseError> for AdminError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            other => {
                error!(error = %other, "Admin request failed on storage");
                Self::Internal
            }
        }
    }
}

impl From<JsonRejection> for AdminError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid JSON body: {}", e.body_text()))
    }
}

impl From<QueueError> for AdminError {
    fn from(e: QueueError) -> Self {
        error!(error = %e, "Admin request failed to queue command");
        Self::Internal
    }
}

impl From<DirectoryError> for AdminError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::SubjectNotFound(pin) => Self::NotFound(format!("Subject not found: {pin}")),
            e @ DirectoryError::NoFingerprints { .. } => Self::NotFound(e.to_string()),
            DirectoryError::Storage(e) => e.into(),
        }
    }
}
