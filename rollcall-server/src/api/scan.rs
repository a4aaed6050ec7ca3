//! Scan ingestion
//!
//! A scanner posts whatever its camera decoded. The payload is either a JSON
//! object (possibly carrying an `attendanceId`/`id` reference plus inline
//! identity fields) or a bare record id. When a reference resolves to a stored
//! record, that record is the identity source; otherwise the inline payload is.
//! A new attendance record is always created.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use rollcall_common::api::ScanRequest;
use rollcall_common::identity::{resolve, Lookup};
use rollcall_common::record::{lookup, text_at, Fields};
use rollcall_common::time::{format_timestamp, now, parse_timestamp};
use serde_json::Value;
use tracing::{info, warn};

use super::attendance::created;
use super::ApiError;
use crate::db::attendance as store;
use crate::AppState;

const FIRST_NAME_CHAIN: &[Lookup] = &[
    Lookup::Text(&["user", "firstName"]),
    Lookup::Text(&["firstName"]),
];

const LAST_NAME_CHAIN: &[Lookup] = &[
    Lookup::Text(&["user", "lastName"]),
    Lookup::Text(&["lastName"]),
];

const PHONE_CHAIN: &[Lookup] = &[
    Lookup::Text(&["user", "phoneNumber"]),
    Lookup::Text(&["phoneNumber"]),
    Lookup::Text(&["user", "phone"]),
    Lookup::Text(&["phone"]),
];

const CITY_CHAIN: &[Lookup] = &[Lookup::Text(&["user", "city"]), Lookup::Text(&["city"])];

const PROVINCE_CHAIN: &[Lookup] = &[
    Lookup::Text(&["user", "province"]),
    Lookup::Text(&["province"]),
];

const COMPANY_NAME_CHAIN: &[Lookup] = &[
    Lookup::Text(&["user", "companyName"]),
    Lookup::Text(&["companyName"]),
    Lookup::Text(&["user", "company"]),
    Lookup::Text(&["company"]),
];

const POSITION_CHAIN: &[Lookup] = &[
    Lookup::Text(&["user", "position"]),
    Lookup::Text(&["position"]),
    Lookup::Text(&["user", "role"]),
    Lookup::Text(&["role"]),
];

/// Single-image fallbacks, tried after the list fields
const SINGLE_IMAGE_CHAIN: &[Lookup] = &[
    Lookup::Text(&["image"]),
    Lookup::Text(&["user", "imageUrl"]),
    Lookup::Text(&["imageUrl"]),
    Lookup::Text(&["user", "image"]),
];

const DEFAULT_AGE: i64 = 18;
const DEFAULT_PHONE: &str = "+1234567890";

/// Decoded QR content
#[derive(Debug, Default, PartialEq)]
pub struct QrPayload {
    /// Id of a previously stored record the code points at
    pub reference: Option<String>,
    /// Inline fields, when the code carried a JSON object
    pub inline: Option<Fields>,
}

/// Decode raw QR text
///
/// A JSON object yields its `attendanceId` (then `id`) as reference and its
/// fields as inline data. Any other text is taken as a bare record id.
pub fn parse_qr(raw: &str) -> QrPayload {
    let trimmed = raw.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(fields)) => {
            let reference = ["attendanceId", "id"].iter().find_map(|key| {
                match fields.get(*key) {
                    Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    _ => None,
                }
            });
            QrPayload {
                reference,
                inline: Some(fields),
            }
        }
        _ if trimmed.is_empty() => QrPayload::default(),
        _ => QrPayload {
            reference: Some(trimmed.to_string()),
            inline: None,
        },
    }
}

/// Identity source for a scan: the stored record (if any) first, then inline fields
struct ScanSource<'a> {
    primary: &'a Fields,
    inline: Option<&'a Fields>,
}

impl ScanSource<'_> {
    fn sources(&self) -> impl Iterator<Item = &Fields> {
        std::iter::once(self.primary).chain(self.inline)
    }

    fn text(&self, chain: &[Lookup]) -> Option<String> {
        self.sources().find_map(|fields| resolve(chain, fields))
    }

    fn user_name_parts(&self) -> Option<(String, String)> {
        let name = text_at(self.primary, &["user", "name"])?;
        let mut words = name.split_whitespace();
        let first = words.next()?.to_string();
        let rest = words.collect::<Vec<_>>().join(" ");
        Some((first, rest))
    }

    fn age(&self) -> i64 {
        [&["user", "age"][..], &["age"][..]]
            .iter()
            .find_map(|path| lookup(self.primary, path).and_then(Value::as_i64))
            .or_else(|| {
                self.inline
                    .and_then(|fields| fields.get("age"))
                    .and_then(Value::as_i64)
            })
            .unwrap_or(DEFAULT_AGE)
    }

    fn images(&self) -> Vec<String> {
        let lists = [&["image"][..], &["user", "image"][..]];
        let from_list = lists.iter().find_map(|path| {
            let items: Vec<String> = lookup(self.primary, path)?
                .as_array()?
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .collect();
            (!items.is_empty()).then_some(items)
        });

        from_list
            .or_else(|| resolve(SINGLE_IMAGE_CHAIN, self.primary).map(|url| vec![url]))
            .unwrap_or_default()
    }

    fn date(&self) -> String {
        self.primary
            .get("date")
            .and_then(parse_timestamp)
            .and_then(rollcall_common::time::millis_to_rfc3339)
            .unwrap_or_else(|| format_timestamp(now()))
    }
}

/// Build the fields of the new attendance record for a scan
pub fn build_scan_record(primary: &Fields, inline: Option<&Fields>, reference: Option<&str>) -> Fields {
    let source = ScanSource { primary, inline };
    let name_parts = source.user_name_parts();

    let first_name = source
        .text(FIRST_NAME_CHAIN)
        .or_else(|| name_parts.as_ref().map(|(first, _)| first.clone()))
        .unwrap_or_else(|| "Unknown".to_string());

    let last_name = source
        .text(LAST_NAME_CHAIN)
        .or_else(|| {
            name_parts
                .as_ref()
                .map(|(_, rest)| rest.clone())
                .filter(|rest| !rest.is_empty())
        })
        .unwrap_or_else(|| "Unknown".to_string());

    let remark = match reference {
        Some(id) => format!("Scanned from QR code - Original ID: {}", id),
        None => "Scanned from QR code".to_string(),
    };

    let mut record = Fields::new();
    record.insert("firstName".into(), first_name.into());
    record.insert("lastName".into(), last_name.into());
    record.insert("age".into(), source.age().into());
    record.insert(
        "phoneNumber".into(),
        source.text(PHONE_CHAIN).unwrap_or_else(|| DEFAULT_PHONE.to_string()).into(),
    );
    record.insert("image".into(), source.images().into());
    record.insert(
        "city".into(),
        source.text(CITY_CHAIN).unwrap_or_else(|| "Unknown".to_string()).into(),
    );
    if let Some(province) = source.text(PROVINCE_CHAIN) {
        record.insert("province".into(), province.into());
    }
    record.insert(
        "companyName".into(),
        source
            .text(COMPANY_NAME_CHAIN)
            .unwrap_or_else(|| "Unknown Company".to_string())
            .into(),
    );
    record.insert(
        "position".into(),
        source
            .text(POSITION_CHAIN)
            .unwrap_or_else(|| "Unknown Position".to_string())
            .into(),
    );
    record.insert("date".into(), source.date().into());
    record.insert("remark".into(), remark.into());
    record
}

/// POST /api/scan
///
/// Body `{"qrData": "..."}`. Returns `201 {"attendance": record}`.
pub async fn scan(
    State(state): State<AppState>,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let raw = request
        .qr_data
        .filter(|qr| !qr.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("QR code data is required".to_string()))?;

    let payload = parse_qr(&raw);

    // A reference that cannot be resolved falls back to the inline payload
    let stored = match payload.reference.as_deref() {
        Some(id) => match store::get(&state.db, id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(reference = %id, "Referenced record lookup failed: {}", e);
                None
            }
        },
        None => None,
    };

    let empty = Fields::new();
    let primary = match (&stored, &payload.inline) {
        (Some(record), _) => record.fields(),
        (None, Some(inline)) => inline,
        (None, None) => &empty,
    };
    let fields = build_scan_record(primary, payload.inline.as_ref(), payload.reference.as_deref());

    let record = store::insert(&state.db, fields)
        .await
        .map_err(|e| ApiError::storage("Failed to record attendance", e))?;

    info!(
        attendance_id = %record.record_id(),
        reference = ?payload.reference,
        resolved = stored.is_some(),
        "Scan recorded"
    );
    Ok(created(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(fields) => fields,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_qr_json_with_attendance_id() {
        let qr = parse_qr(r#" {"attendanceId": "abc", "id": "other", "firstName": "Ada"} "#);
        assert_eq!(qr.reference.as_deref(), Some("abc"));
        assert_eq!(qr.inline.unwrap()["firstName"], "Ada");
    }

    #[test]
    fn test_parse_qr_json_with_id_only() {
        let qr = parse_qr(r#"{"id": "xyz"}"#);
        assert_eq!(qr.reference.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_parse_qr_json_without_reference() {
        let qr = parse_qr(r#"{"firstName": "Ada"}"#);
        assert!(qr.reference.is_none());
        assert!(qr.inline.is_some());
    }

    #[test]
    fn test_parse_qr_bare_id() {
        let qr = parse_qr("  65f1c0ffee  ");
        assert_eq!(qr.reference.as_deref(), Some("65f1c0ffee"));
        assert!(qr.inline.is_none());

        // Numbers are ids too, not JSON payloads
        let qr = parse_qr("12345");
        assert_eq!(qr.reference.as_deref(), Some("12345"));
    }

    #[test]
    fn test_build_from_nested_user() {
        let source = fields(json!({
            "user": {
                "name": "Grace Brewster Hopper",
                "company": "Navy",
                "role": "Admiral",
                "imageUrl": "https://img.example/g.png",
                "age": 85
            }
        }));
        let record = build_scan_record(&source, None, Some("ref-1"));

        assert_eq!(record["firstName"], "Grace");
        assert_eq!(record["lastName"], "Brewster Hopper");
        assert_eq!(record["age"], 85);
        assert_eq!(record["companyName"], "Navy");
        assert_eq!(record["position"], "Admiral");
        assert_eq!(record["image"], json!(["https://img.example/g.png"]));
        assert_eq!(record["remark"], "Scanned from QR code - Original ID: ref-1");
    }

    #[test]
    fn test_build_defaults_from_empty_source() {
        let record = build_scan_record(&Fields::new(), None, None);

        assert_eq!(record["firstName"], "Unknown");
        assert_eq!(record["lastName"], "Unknown");
        assert_eq!(record["age"], 18);
        assert_eq!(record["phoneNumber"], "+1234567890");
        assert_eq!(record["image"], json!([]));
        assert_eq!(record["city"], "Unknown");
        assert!(record.get("province").is_none());
        assert_eq!(record["companyName"], "Unknown Company");
        assert_eq!(record["position"], "Unknown Position");
        assert_eq!(record["remark"], "Scanned from QR code");
        assert!(parse_timestamp(&record["date"]).is_some());
    }

    #[test]
    fn test_stored_record_beats_inline_payload() {
        let stored = fields(json!({
            "firstName": "Stored",
            "lastName": "Person",
            "image": ["a.png", "", "b.png"],
            "date": "2024-05-01T09:00:00Z"
        }));
        let inline = fields(json!({"firstName": "Inline", "city": "Oslo"}));
        let record = build_scan_record(&stored, Some(&inline), Some("id-1"));

        assert_eq!(record["firstName"], "Stored");
        assert_eq!(record["city"], "Oslo");
        assert_eq!(record["image"], json!(["a.png", "b.png"]));
        assert_eq!(record["date"], "2024-05-01T09:00:00.000Z");
    }

    #[test]
    fn test_single_image_string_becomes_list() {
        let source = fields(json!({"image": "one.png"}));
        let record = build_scan_record(&source, None, None);
        assert_eq!(record["image"], json!(["one.png"]));
    }
}
