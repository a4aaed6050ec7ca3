//! HTTP API handlers for rollcall-display

pub mod display;
pub mod health;
pub mod sse;
pub mod ui;

pub use display::{get_display, reset_display, test_display, DisplayApiError};
pub use health::health_routes;
pub use sse::event_stream;
pub use ui::{serve_index, serve_kiosk_js};
