//! Ticket endpoints
//!
//! Bulk import of the issuer's ticket export and single-use redemption at
//! the gate.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use rollcall_common::record::text_at;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::attendance::object_body;
use super::ApiError;
use crate::db::tickets::{self as store, ImportSummary, NewTicket, ScanOutcome, Ticket, TicketDetails};
use crate::AppState;

pub const TICKET_NOT_FOUND: &str =
    "Ticket not found. Please ensure the ticket data has been imported first.";

pub const ALREADY_SCANNED: &str = "Ticket already scanned";

/// One row of an import body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRow {
    transaction_id: Option<String>,
    qr_code: Option<String>,
    is_valid: Option<bool>,
    #[serde(flatten)]
    details: TicketDetails,
}

/// Accept either a bare array or `{"tickets": [...]}`
fn import_rows(body: Value) -> Result<Vec<Value>, ApiError> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut fields) => match fields.remove("tickets") {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    if rows.is_empty() {
        return Err(ApiError::BadRequest("No tickets provided".to_string()));
    }
    Ok(rows)
}

fn parse_row(index: usize, row: Value) -> Result<NewTicket, ApiError> {
    let row: ImportRow = serde_json::from_value(row)
        .map_err(|e| ApiError::BadRequest(format!("Ticket at index {}: {}", index, e)))?;

    let transaction_id = row
        .transaction_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest(format!("Ticket at index {}: transactionId is required", index))
        })?;

    let qr_code = row
        .qr_code
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| transaction_id.clone());

    Ok(NewTicket {
        transaction_id,
        qr_code,
        is_valid: row.is_valid.unwrap_or(true),
        details: row.details,
    })
}

/// POST /tickets/import
///
/// Every row is validated before anything is written. Known transaction ids
/// are counted as matched and left as stored.
pub async fn import_tickets(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ImportSummary>), ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let tickets = import_rows(body)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| parse_row(index, row))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = store::import(&state.db, tickets)
        .await
        .map_err(|e| ApiError::storage("Failed to import tickets", e))?;

    info!(
        inserted = summary.inserted,
        matched = summary.matched,
        total = summary.total,
        "Tickets imported"
    );
    Ok((StatusCode::CREATED, Json(summary)))
}

/// POST /tickets/scan
///
/// Redeems the ticket whose QR code or transaction id equals `qrCode`.
pub async fn scan_ticket(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let fields = object_body(body)?;
    let code = text_at(&fields, &["qrCode"])
        .ok_or_else(|| ApiError::BadRequest("qrCode must be a non-empty string".to_string()))?;

    let outcome = store::scan(&state.db, code)
        .await
        .map_err(|e| ApiError::storage("Failed to scan ticket", e))?;

    match outcome {
        ScanOutcome::Scanned(ticket) => {
            info!(ticket_id = %ticket.id, transaction_id = %ticket.transaction_id, "Ticket admitted");
            Ok(Json(ticket))
        }
        ScanOutcome::AlreadyScanned(ticket) => {
            info!(ticket_id = %ticket.id, "Rejected repeat scan");
            Err(ApiError::BadRequest(ALREADY_SCANNED.to_string()))
        }
        ScanOutcome::NotFound => Err(ApiError::NotFound(TICKET_NOT_FOUND.to_string())),
    }
}

/// GET /tickets
pub async fn list_tickets(State(state): State<AppState>) -> Result<Json<Vec<Ticket>>, ApiError> {
    store::list(&state.db)
        .await
        .map(Json)
        .map_err(|e| ApiError::storage("Failed to list tickets", e))
}

/// GET /tickets/:id
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    store::get(&state.db, &id)
        .await
        .map_err(|e| ApiError::storage("Failed to fetch ticket", e))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ticket with id {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_rows_accepts_both_shapes() {
        assert_eq!(import_rows(json!([{"transactionId": "A"}])).unwrap().len(), 1);
        assert_eq!(
            import_rows(json!({"tickets": [{"transactionId": "A"}, {"transactionId": "B"}]}))
                .unwrap()
                .len(),
            2
        );
        assert!(import_rows(json!({"tickets": []})).is_err());
        assert!(import_rows(json!({})).is_err());
    }

    #[test]
    fn test_parse_row_defaults() {
        let ticket = parse_row(0, json!({"transactionId": "TX-1", "eventName": "Final", "ticketCount": 2}))
            .unwrap();
        assert_eq!(ticket.qr_code, "TX-1");
        assert!(ticket.is_valid);
        assert_eq!(ticket.details.event_name.as_deref(), Some("Final"));
        assert_eq!(ticket.details.ticket_count, Some(2.0));
    }

    #[test]
    fn test_parse_row_names_index() {
        let err = parse_row(3, json!({"transactionId": "   "})).unwrap_err();
        match err {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Ticket at index 3: transactionId is required"),
            other => panic!("expected bad request, got {:?}", other),
        }
    }
}
