//! HTTP surface: terminal endpoints, the admin API, and the root banner.

pub mod admin;
pub mod auth;
pub mod error;
pub mod iclock;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use error::AdminError;

const BANNER: &str = "ADMS Server Ready";

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let admin = admin::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_api_key,
    ));

    Router::new()
        .route("/", get(root))
        .merge(iclock::routes())
        .nest("/admin", admin)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    BANNER
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
