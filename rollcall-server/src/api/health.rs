//! Health check endpoint

use axum::{routing::get, Json, Router};
use rollcall_common::api::HealthResponse;

use crate::AppState;

/// GET /health
///
/// Returns status, module name, and version.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok("rollcall-server", env!("CARGO_PKG_VERSION")))
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
