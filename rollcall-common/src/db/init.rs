//! Database initialization
//!
//! Creates the database file and schema on first run; opening an existing
//! database is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// SQLite busy timeout applied to every connection
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the latest-record reads run alongside scan writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
        .execute(&pool)
        .await?;

    create_attendance_table(&pool).await?;
    create_tickets_table(&pool).await?;

    Ok(pool)
}

/// Attendance records are stored as their JSON payload plus the columns the
/// read paths order and filter by.
async fn create_attendance_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance_created_at ON attendance(created_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Imported tickets, keyed by the issuer's transaction id. Optional
/// issuer fields travel as one JSON document in `details`.
async fn create_tickets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tickets (
            id TEXT PRIMARY KEY,
            transaction_id TEXT NOT NULL UNIQUE,
            qr_code TEXT NOT NULL,
            details TEXT NOT NULL,
            is_valid INTEGER NOT NULL DEFAULT 0,
            scanned_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tickets_qr_code ON tickets(qr_code)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tickets_scanned_at ON tickets(scanned_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
