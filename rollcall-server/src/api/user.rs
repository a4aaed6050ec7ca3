//! Identity lookup for the print/result flow
//!
//! Resolves a scanned reference to the same normalized identity the kiosk
//! display shows.

use axum::{
    extract::{Query, State},
    Json,
};
use rollcall_common::api::UserQuery;
use rollcall_common::identity::{extract_identity, DisplayedIdentity};

use super::scan::parse_qr;
use super::ApiError;
use crate::db::attendance as store;
use crate::AppState;

/// GET /api/user?qr=<reference>
///
/// The reference is a record id, or a JSON QR payload carrying one. A payload
/// without a reference is resolved from its own fields.
pub async fn lookup_user(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<DisplayedIdentity>, ApiError> {
    let raw = query
        .qr
        .filter(|qr| !qr.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("QR code data is required".to_string()))?;

    let payload = parse_qr(&raw);

    match (payload.reference, payload.inline) {
        (Some(id), _) => {
            let record = store::get(&state.db, &id)
                .await
                .map_err(|e| ApiError::storage("Failed to fetch user data", e))?
                .ok_or_else(|| ApiError::NotFound("Attendance record not found".to_string()))?;
            Ok(Json(extract_identity(record.fields())))
        }
        (None, Some(inline)) => Ok(Json(extract_identity(&inline))),
        (None, None) => Err(ApiError::BadRequest("QR code data is required".to_string())),
    }
}
