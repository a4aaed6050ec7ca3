//! rollcall-display library - kiosk welcome display
//!
//! Polls rollcall-server for its latest attendance record and shows each
//! newly arrived identity exactly once for a fixed dwell. The kiosk page
//! renders the published display state from an SSE stream.

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod poller;
pub mod slot;

pub use controller::{DisplayController, DisplayHandle, DisplayTiming, PollerHandle};
pub use error::{DisplayError, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Command and snapshot access to the running driver
    pub display: DisplayHandle,
}

impl AppState {
    pub fn new(display: DisplayHandle) -> Self {
        Self { display }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let ui = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/kiosk.js", get(api::serve_kiosk_js));

    let display = Router::new()
        .route("/events", get(api::event_stream))
        .route("/api/display", get(api::get_display))
        .route("/api/display/reset", post(api::reset_display))
        .route("/api/display/test", post(api::test_display));

    Router::new()
        .merge(ui)
        .merge(display)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
