//! # Rollcall Common Library
//!
//! Shared code for the rollcall services including:
//! - Attendance record model and field lookups
//! - Identity extraction (normalized name/company/position/portrait)
//! - Latest-record resolution by recency
//! - API request/response types
//! - Configuration loading
//! - Database initialization

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod identity;
pub mod recency;
pub mod record;
pub mod time;

pub use error::{Error, Result};
pub use identity::{extract_identity, DisplayedIdentity};
pub use recency::resolve_latest;
pub use record::{AttendanceRecord, Fields};
