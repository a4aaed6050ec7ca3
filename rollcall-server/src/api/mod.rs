//! HTTP API handlers for rollcall-server

pub mod attendance;
pub mod error;
pub mod health;
pub mod scan;
pub mod tickets;
pub mod user;

pub use attendance::{
    create_attendance, delete_attendance, get_attendance, latest_attendance, list_attendance,
    update_attendance,
};
pub use error::ApiError;
pub use health::health_routes;
pub use scan::scan;
pub use tickets::{get_ticket, import_tickets, list_tickets, scan_ticket};
pub use user::lookup_user;
