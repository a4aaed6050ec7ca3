//! Ticket queries
//!
//! Tickets are imported in bulk from the issuer's export and redeemed once at
//! the gate. A ticket is keyed by its `transaction_id`; re-importing a known
//! transaction leaves the stored ticket untouched.

use rollcall_common::time::{format_timestamp, now};
use rollcall_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

const TICKET_COLUMNS: &str =
    "id, transaction_id, qr_code, details, is_valid, scanned_at, created_at, updated_at";

/// Issuer fields carried through import as-is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_amount: Option<f64>,
}

/// A validated import row
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub transaction_id: String,
    pub qr_code: String,
    pub is_valid: bool,
    pub details: TicketDetails,
}

impl NewTicket {
    /// QR code defaults to the transaction id; tickets import as valid
    pub fn new(transaction_id: impl Into<String>) -> Self {
        let transaction_id = transaction_id.into();
        Self {
            qr_code: transaction_id.clone(),
            transaction_id,
            is_valid: true,
            details: TicketDetails::default(),
        }
    }
}

/// Stored ticket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub qr_code: String,
    pub transaction_id: String,
    #[serde(flatten)]
    pub details: TicketDetails,
    pub is_valid: bool,
    pub scanned_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Counts reported back to the importer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// New tickets written
    pub inserted: u64,
    /// Rows whose transaction id was already known
    pub matched: u64,
    /// Existing tickets changed; import never changes one
    pub modified: u64,
    pub total: u64,
}

/// Result of redeeming a code
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Scanned(Ticket),
    AlreadyScanned(Ticket),
    NotFound,
}

fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket> {
    let id: String = row.try_get("id")?;
    let details: String = row.try_get("details")?;
    let details = serde_json::from_str(&details)
        .map_err(|e| Error::Internal(format!("Corrupt details for ticket {}: {}", id, e)))?;

    Ok(Ticket {
        qr_code: row.try_get("qr_code")?,
        transaction_id: row.try_get("transaction_id")?,
        details,
        is_valid: row.try_get("is_valid")?,
        scanned_at: row.try_get("scanned_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        id,
    })
}

/// Insert every ticket whose transaction id is new, in one transaction
pub async fn import(pool: &SqlitePool, tickets: Vec<NewTicket>) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        total: tickets.len() as u64,
        ..ImportSummary::default()
    };
    let stamp = format_timestamp(now());

    let mut tx = pool.begin().await?;
    for ticket in &tickets {
        let details = serde_json::to_string(&ticket.details)
            .map_err(|e| Error::Internal(format!("Details encoding failed: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO tickets (id, transaction_id, qr_code, details, is_valid, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(transaction_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&ticket.transaction_id)
        .bind(&ticket.qr_code)
        .bind(&details)
        .bind(ticket.is_valid)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            summary.inserted += 1;
        } else {
            summary.matched += 1;
        }
    }
    tx.commit().await?;

    debug!(inserted = summary.inserted, matched = summary.matched, "Imported tickets");
    Ok(summary)
}

/// Fetch one ticket by id
pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Ticket>> {
    let row = sqlx::query(&format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_ticket).transpose()
}

/// Ticket whose QR code or transaction id equals `code`; QR matches win
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Ticket>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM tickets
         WHERE qr_code = ? OR transaction_id = ?
         ORDER BY qr_code = ? DESC, created_at, rowid
         LIMIT 1",
        TICKET_COLUMNS
    ))
    .bind(code)
    .bind(code)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_ticket).transpose()
}

/// All tickets, most recently scanned first, never-scanned last
pub async fn list(pool: &SqlitePool) -> Result<Vec<Ticket>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tickets ORDER BY scanned_at DESC, created_at DESC, rowid DESC",
        TICKET_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_ticket).collect()
}

/// Redeem a code: stamp `scanned_at` and mark valid, at most once per ticket
pub async fn scan(pool: &SqlitePool, code: &str) -> Result<ScanOutcome> {
    let Some(ticket) = find_by_code(pool, code).await? else {
        return Ok(ScanOutcome::NotFound);
    };

    if ticket.scanned_at.is_some() {
        return Ok(ScanOutcome::AlreadyScanned(ticket));
    }

    let stamp = format_timestamp(now());
    // Guarded on scanned_at so two gates racing on one ticket redeem it once
    let result = sqlx::query(
        "UPDATE tickets SET scanned_at = ?, is_valid = 1, updated_at = ?
         WHERE id = ? AND scanned_at IS NULL",
    )
    .bind(&stamp)
    .bind(&stamp)
    .bind(&ticket.id)
    .execute(pool)
    .await?;

    let current = get(pool, &ticket.id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Ticket {} vanished during scan", ticket.id)))?;

    if result.rows_affected() == 0 {
        return Ok(ScanOutcome::AlreadyScanned(current));
    }

    debug!(ticket_id = %current.id, "Ticket scanned");
    Ok(ScanOutcome::Scanned(current))
}
