//! Attendance record queries
//!
//! Records are stored as their JSON payload; `id`, `createdAt` and
//! `updatedAt` live in columns and are written back into the payload on read,
//! so stored rows always present a flat record with server-assigned fields.

use rollcall_common::record::{AttendanceRecord, Fields};
use rollcall_common::time::{format_timestamp, now};
use rollcall_common::{Error, Result};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Fields the server owns; client-supplied values are discarded
const SERVER_FIELDS: [&str; 6] = ["id", "_id", "createdAt", "updatedAt", "created_at", "updated_at"];

fn strip_server_fields(fields: &mut Fields) {
    for key in SERVER_FIELDS {
        fields.remove(key);
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<AttendanceRecord> {
    let id: String = row.try_get("id")?;
    let payload: String = row.try_get("payload")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let mut fields = match serde_json::from_str::<Value>(&payload) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) | Err(_) => {
            return Err(Error::Internal(format!("Corrupt payload for attendance {}", id)));
        }
    };
    fields.insert("id".to_string(), Value::String(id));
    fields.insert("createdAt".to_string(), Value::String(created_at));
    fields.insert("updatedAt".to_string(), Value::String(updated_at));

    Ok(AttendanceRecord::new(fields))
}

fn encode_payload(fields: &Fields) -> Result<String> {
    serde_json::to_string(fields).map_err(|e| Error::Internal(format!("Payload encoding failed: {}", e)))
}

/// Persist a new record, assigning its id and timestamps
pub async fn insert(pool: &SqlitePool, mut fields: Fields) -> Result<AttendanceRecord> {
    strip_server_fields(&mut fields);

    let id = Uuid::new_v4().to_string();
    let stamp = format_timestamp(now());
    let payload = encode_payload(&fields)?;

    sqlx::query(
        "INSERT INTO attendance (id, payload, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&payload)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await?;

    debug!(attendance_id = %id, "Inserted attendance record");

    fields.insert("id".to_string(), Value::String(id));
    fields.insert("createdAt".to_string(), Value::String(stamp.clone()));
    fields.insert("updatedAt".to_string(), Value::String(stamp));
    Ok(AttendanceRecord::new(fields))
}

/// Fetch one record by id
pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<AttendanceRecord>> {
    let row = sqlx::query("SELECT id, payload, created_at, updated_at FROM attendance WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_record).transpose()
}

/// Total number of records
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

/// Page of records, newest first
pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        "SELECT id, payload, created_at, updated_at FROM attendance
         ORDER BY created_at DESC, rowid DESC
         LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_record).collect()
}

/// The most recently created records, the candidate window for "latest"
pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<AttendanceRecord>> {
    list(pool, limit, 0).await
}

/// Shallow-merge `patch` into a stored record and bump `updatedAt`
///
/// Returns `None` when the record does not exist.
pub async fn update(pool: &SqlitePool, id: &str, mut patch: Fields) -> Result<Option<AttendanceRecord>> {
    let Some(existing) = get(pool, id).await? else {
        return Ok(None);
    };

    let mut fields = existing.fields().clone();
    strip_server_fields(&mut fields);
    strip_server_fields(&mut patch);
    fields.extend(patch);

    let stamp = format_timestamp(now());
    let payload = encode_payload(&fields)?;

    sqlx::query("UPDATE attendance SET payload = ?, updated_at = ? WHERE id = ?")
        .bind(&payload)
        .bind(&stamp)
        .bind(id)
        .execute(pool)
        .await?;

    get(pool, id).await
}

/// Delete a record; `false` when it did not exist
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
