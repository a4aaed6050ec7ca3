//! Shared HTTP API types
//!
//! Request/response bodies used by both rollcall-server and rollcall-display.
//! No HTTP framework dependency lives here; each service wraps these with axum.

pub mod types;

pub use types::{ErrorResponse, HealthResponse, ScanRequest, UserQuery};
