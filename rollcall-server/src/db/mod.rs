//! Database access layer for rollcall-server

use rollcall_common::config::database_path;
use rollcall_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

pub mod attendance;
pub mod tickets;

/// Open (creating if needed) the database inside a root folder
pub async fn connect(root_folder: &Path) -> Result<SqlitePool> {
    rollcall_common::db::init_database(&database_path(root_folder)).await
}
