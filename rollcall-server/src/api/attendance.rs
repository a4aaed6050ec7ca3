//! Attendance record endpoints
//!
//! CRUD over stored records plus the latest-record read path the kiosk
//! displays poll.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use rollcall_common::recency::take_latest;
use rollcall_common::record::{text_at, AttendanceRecord, Fields};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::ApiError;
use crate::db::attendance as store;
use crate::pagination::calculate_pagination;
use crate::AppState;

/// How many of the most recently created records are considered for "latest"
pub const LATEST_WINDOW: i64 = 100;

/// Query parameters for listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Paginated listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePage {
    pub data: Vec<AttendanceRecord>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// Require a JSON object body
pub(crate) fn object_body(body: Result<Json<Value>, JsonRejection>) -> Result<Fields, ApiError> {
    match body {
        Ok(Json(Value::Object(fields))) => Ok(fields),
        Ok(Json(_)) => Err(ApiError::BadRequest("Request body must be a JSON object".to_string())),
        Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
    }
}

/// `201 {"attendance": record}`
pub(crate) fn created(record: AttendanceRecord) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "attendance": record })))
}

/// POST /attendance
///
/// Creates a record from a JSON object. `firstName` and `lastName` are required.
pub async fn create_attendance(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let fields = object_body(body)?;

    for required in ["firstName", "lastName"] {
        if text_at(&fields, &[required]).is_none() {
            return Err(ApiError::BadRequest(format!(
                "{} must be a non-empty string",
                required
            )));
        }
    }

    let record = store::insert(&state.db, fields)
        .await
        .map_err(|e| ApiError::storage("Failed to create attendance record", e))?;

    info!(attendance_id = %record.record_id(), "Attendance record created");
    Ok(created(record))
}

/// GET /attendance?page=1&limit=10
///
/// Newest records first.
pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<AttendancePage>, ApiError> {
    let total = store::count(&state.db)
        .await
        .map_err(|e| ApiError::storage("Failed to count attendance records", e))?;

    let pagination = calculate_pagination(total, query.page, query.limit);

    let data = store::list(&state.db, pagination.limit, pagination.offset)
        .await
        .map_err(|e| ApiError::storage("Failed to list attendance records", e))?;

    Ok(Json(AttendancePage {
        data,
        total,
        page: pagination.page,
        limit: pagination.limit,
        total_pages: pagination.total_pages,
    }))
}

/// GET /attendance/latest
///
/// The record with the greatest `max(createdAt, updatedAt)` among the recent
/// window. 404 when there are no records yet, which is a normal state.
pub async fn latest_attendance(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let candidates = store::recent(&state.db, LATEST_WINDOW)
        .await
        .map_err(|e| ApiError::storage("Failed to fetch latest attendance", e))?;

    let latest = take_latest(candidates)
        .ok_or_else(|| ApiError::NotFound("No attendance records found".to_string()))?;

    debug!(attendance_id = %latest.record_id(), "Resolved latest attendance");
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(latest)))
}

/// GET /attendance/:id
pub async fn get_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AttendanceRecord>, ApiError> {
    store::get(&state.db, &id)
        .await
        .map_err(|e| ApiError::storage("Failed to fetch attendance record", e))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Attendance with id {} not found", id)))
}

/// PATCH /attendance/:id
///
/// Shallow-merges the body into the record; bumps `updatedAt`.
pub async fn update_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AttendanceRecord>, ApiError> {
    let patch = object_body(body)?;

    let updated = store::update(&state.db, &id, patch)
        .await
        .map_err(|e| ApiError::storage("Failed to update attendance record", e))?
        .ok_or_else(|| ApiError::NotFound(format!("Attendance with id {} not found", id)))?;

    info!(attendance_id = %id, "Attendance record updated");
    Ok(Json(updated))
}

/// DELETE /attendance/:id
pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = store::delete(&state.db, &id)
        .await
        .map_err(|e| ApiError::storage("Failed to delete attendance record", e))?;

    if deleted {
        info!(attendance_id = %id, "Attendance record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Attendance with id {} not found", id)))
    }
}
