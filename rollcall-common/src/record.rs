//! Attendance record model
//!
//! Records arrive from several producers (scan ingestion, direct creation,
//! stored rows) and do not share one fixed shape: identity fields may be flat
//! or nested under `user`, timestamps may be camelCase or snake_case, the id
//! may be `id` or `_id`. `AttendanceRecord` keeps the raw object and exposes
//! total accessors over it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::recency;
use crate::time::parse_timestamp;

/// Raw key-value fields of a record
pub type Fields = Map<String, Value>;

/// Prefix reserved for content-derived record ids
pub const SYNTHETIC_ID_PREFIX: &str = "sha256:";

/// A loosely-typed attendance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceRecord(Fields);

impl AttendanceRecord {
    pub fn new(fields: Fields) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Fields {
        &self.0
    }

    /// Server-assigned id (`id`, then `_id`), if the record carries one
    pub fn server_id(&self) -> Option<String> {
        ["id", "_id"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(id_value))
    }

    /// Identity key used for change detection
    ///
    /// Falls back to a content hash when the record has no id, so the same
    /// id-less record always maps to the same key and two different records
    /// never share one.
    pub fn record_id(&self) -> String {
        self.server_id().unwrap_or_else(|| synthetic_id(&self.0))
    }

    /// `createdAt` (or `created_at`) as epoch milliseconds
    pub fn created_at(&self) -> Option<i64> {
        first_timestamp(&self.0, &["createdAt", "created_at"])
    }

    /// `updatedAt` (or `updated_at`) as epoch milliseconds
    pub fn updated_at(&self) -> Option<i64> {
        first_timestamp(&self.0, &["updatedAt", "updated_at"])
    }

    /// `max(createdAt, updatedAt)`, or `None` when neither is usable
    pub fn recency_millis(&self) -> Option<i64> {
        match (self.created_at(), self.updated_at()) {
            (Some(c), Some(u)) => Some(c.max(u)),
            (c, u) => c.or(u),
        }
    }
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        // Extended-JSON object ids: {"$oid": "..."}
        Value::Object(obj) => obj.get("$oid").and_then(id_value),
        _ => None,
    }
}

fn synthetic_id(fields: &Fields) -> String {
    // serde_json::Map is key-ordered, so serialization is canonical
    let canonical = serde_json::to_vec(fields).unwrap_or_default();
    format!("{}{:x}", SYNTHETIC_ID_PREFIX, Sha256::digest(&canonical))
}

fn first_timestamp(fields: &Fields, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(parse_timestamp))
}

/// Follow a field path through nested objects
pub fn lookup<'a>(fields: &'a Fields, path: &[&str]) -> Option<&'a Value> {
    let (last, parents) = path.split_last()?;
    let mut current = fields;
    for key in parents {
        current = current.get(*key)?.as_object()?;
    }
    current.get(*last)
}

/// Non-blank string at a field path
pub fn text_at<'a>(fields: &'a Fields, path: &[&str]) -> Option<&'a str> {
    lookup(fields, path)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// First element of a list at a field path, when it is a non-blank string
pub fn first_text_at<'a>(fields: &'a Fields, path: &[&str]) -> Option<&'a str> {
    lookup(fields, path)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Extract the single record carried by a read-path response body
///
/// Unwrapping order: `{"attendance": {...}}`, a non-empty `{"data": [...]}`,
/// a non-empty top-level array, then the object itself. Arrays are resolved
/// by recency rather than position.
pub fn unwrap_envelope(body: Value) -> Option<AttendanceRecord> {
    match body {
        Value::Object(mut fields) => {
            if matches!(fields.get("attendance"), Some(Value::Object(_))) {
                return fields.remove("attendance").and_then(AttendanceRecord::from_value);
            }
            let has_page = matches!(fields.get("data"), Some(Value::Array(items)) if !items.is_empty());
            if has_page {
                if let Some(Value::Array(items)) = fields.remove("data") {
                    return latest_of(items);
                }
            }
            Some(AttendanceRecord(fields))
        }
        Value::Array(items) => latest_of(items),
        _ => None,
    }
}

fn latest_of(items: Vec<Value>) -> Option<AttendanceRecord> {
    let records: Vec<AttendanceRecord> = items
        .into_iter()
        .filter_map(AttendanceRecord::from_value)
        .collect();
    recency::take_latest(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> AttendanceRecord {
        AttendanceRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_record_id_prefers_id_then_underscore_id() {
        assert_eq!(record(json!({"id": "a", "_id": "b"})).record_id(), "a");
        assert_eq!(record(json!({"_id": "b"})).record_id(), "b");
        assert_eq!(record(json!({"_id": {"$oid": "c0ffee"}})).record_id(), "c0ffee");
        assert_eq!(record(json!({"id": 42})).record_id(), "42");
    }

    #[test]
    fn test_blank_id_is_not_an_id() {
        let rec = record(json!({"id": "  ", "name": "Ann"}));
        assert!(rec.server_id().is_none());
        assert!(rec.record_id().starts_with(SYNTHETIC_ID_PREFIX));
    }

    #[test]
    fn test_synthetic_id_is_stable_per_content() {
        let a1 = record(json!({"name": "Ann", "createdAt": 10}));
        let a2 = record(json!({"createdAt": 10, "name": "Ann"}));
        let b = record(json!({"name": "Ann", "createdAt": 11}));

        assert_eq!(a1.record_id(), a2.record_id());
        assert_ne!(a1.record_id(), b.record_id());
    }

    #[test]
    fn test_timestamp_field_variants() {
        let rec = record(json!({"created_at": 10, "updated_at": "1970-01-01T00:00:00.020Z"}));
        assert_eq!(rec.created_at(), Some(10));
        assert_eq!(rec.updated_at(), Some(20));
        assert_eq!(rec.recency_millis(), Some(20));
    }

    #[test]
    fn test_recency_missing_fields() {
        assert_eq!(record(json!({"updatedAt": 15})).recency_millis(), Some(15));
        assert_eq!(record(json!({})).recency_millis(), None);
        assert_eq!(record(json!({"createdAt": "not a date"})).recency_millis(), None);
    }

    #[test]
    fn test_lookup_paths() {
        let rec = record(json!({"user": {"name": "Ann", "image": ["", "x"]}, "photo": " "}));
        assert_eq!(text_at(rec.fields(), &["user", "name"]), Some("Ann"));
        assert_eq!(text_at(rec.fields(), &["photo"]), None);
        assert_eq!(first_text_at(rec.fields(), &["user", "image"]), None);
        assert_eq!(text_at(rec.fields(), &["user", "name", "deeper"]), None);
        assert_eq!(lookup(rec.fields(), &[]), None);
    }

    #[test]
    fn test_unwrap_attendance_envelope() {
        let rec = unwrap_envelope(json!({"attendance": {"id": "a"}, "qrCode": "x"})).unwrap();
        assert_eq!(rec.record_id(), "a");
    }

    #[test]
    fn test_unwrap_data_page_resolves_by_recency() {
        let body = json!({"data": [
            {"id": "old", "createdAt": 10},
            {"id": "new", "updatedAt": 15}
        ], "total": 2});
        assert_eq!(unwrap_envelope(body).unwrap().record_id(), "new");
    }

    #[test]
    fn test_unwrap_bare_array_and_object() {
        let rec = unwrap_envelope(json!([{"id": "x"}, 3, "y"])).unwrap();
        assert_eq!(rec.record_id(), "x");

        let rec = unwrap_envelope(json!({"id": "plain"})).unwrap();
        assert_eq!(rec.record_id(), "plain");
    }

    #[test]
    fn test_unwrap_rejects_non_objects() {
        assert!(unwrap_envelope(json!([])).is_none());
        assert!(unwrap_envelope(json!("text")).is_none());
        assert!(unwrap_envelope(json!(null)).is_none());
    }

    #[test]
    fn test_empty_data_array_falls_back_to_object() {
        let rec = unwrap_envelope(json!({"id": "outer", "data": []})).unwrap();
        assert_eq!(rec.record_id(), "outer");
    }
}
