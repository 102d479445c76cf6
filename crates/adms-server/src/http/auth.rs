//! `x-api-key` guard for the admin API.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use super::error::AdminError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AdminError> {
    let Some(expected) = state.admin_api_key.as_deref() else {
        warn!("Admin request refused: no API key configured");
        return Err(AdminError::NotConfigured);
    };

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if presented != Some(expected) {
        warn!(path = %request.uri().path(), "Admin request with missing or wrong API key");
        return Err(AdminError::Unauthorized);
    }

    Ok(next.run(request).await)
}
