//! rollcall-server library - attendance storage and read/write API
//!
//! Owns the attendance database. Scanner devices write through
//! `POST /api/scan`; kiosk displays poll `GET /attendance/latest`. Gate
//! devices redeem imported tickets through `POST /tickets/scan`.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod db;
pub mod pagination;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let attendance = Router::new()
        .route(
            "/attendance",
            get(api::list_attendance).post(api::create_attendance),
        )
        .route("/attendance/latest", get(api::latest_attendance))
        .route(
            "/attendance/:id",
            get(api::get_attendance)
                .patch(api::update_attendance)
                .delete(api::delete_attendance),
        );

    let scanner = Router::new()
        .route("/api/scan", post(api::scan))
        .route("/api/user", get(api::lookup_user));

    let tickets = Router::new()
        .route("/tickets", get(api::list_tickets))
        .route("/tickets/import", post(api::import_tickets))
        .route("/tickets/scan", post(api::scan_ticket))
        .route("/tickets/:id", get(api::get_ticket));

    Router::new()
        .merge(attendance)
        .merge(scanner)
        .merge(tickets)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        // Scanner pages are served from other origins
        .layer(CorsLayer::permissive())
        .with_state(state)
}
