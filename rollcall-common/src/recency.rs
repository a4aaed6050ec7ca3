//! Latest-record resolution
//!
//! "Latest" is last-write-wins over two timestamps: a record's recency is
//! `max(createdAt, updatedAt)` with missing fields counted as the epoch.
//! Ties go to the record encountered first.

use crate::record::AttendanceRecord;

/// Recency of a record in epoch milliseconds (missing timestamps count as 0)
pub fn recency(record: &AttendanceRecord) -> i64 {
    record.recency_millis().unwrap_or(0)
}

/// Index of the most recent record, or `None` for an empty slice
pub fn latest_index(records: &[AttendanceRecord]) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (index, record) in records.iter().enumerate() {
        let candidate = recency(record);
        match best {
            Some((_, best_recency)) if candidate <= best_recency => {}
            _ => best = Some((index, candidate)),
        }
    }
    best.map(|(index, _)| index)
}

/// Pick the most recent record out of a set
pub fn resolve_latest(records: &[AttendanceRecord]) -> Option<&AttendanceRecord> {
    latest_index(records).map(|index| &records[index])
}

/// Owned variant of [`resolve_latest`]
pub fn take_latest(mut records: Vec<AttendanceRecord>) -> Option<AttendanceRecord> {
    latest_index(&records).map(|index| records.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(values: Vec<Value>) -> Vec<AttendanceRecord> {
        values
            .into_iter()
            .map(|v| AttendanceRecord::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_set_has_no_latest() {
        assert!(resolve_latest(&[]).is_none());
        assert!(take_latest(Vec::new()).is_none());
    }

    #[test]
    fn test_updated_at_beats_older_created_at() {
        // X created at 10, Y only updated at 15 -> Y
        let set = records(vec![
            json!({"id": "x", "createdAt": 10}),
            json!({"id": "y", "updatedAt": 15}),
        ]);
        assert_eq!(resolve_latest(&set).unwrap().record_id(), "y");
    }

    #[test]
    fn test_max_of_both_fields_is_used() {
        let set = records(vec![
            json!({"id": "a", "createdAt": 50, "updatedAt": 5}),
            json!({"id": "b", "createdAt": 20, "updatedAt": 40}),
        ]);
        assert_eq!(resolve_latest(&set).unwrap().record_id(), "a");
    }

    #[test]
    fn test_missing_timestamps_count_as_epoch() {
        let set = records(vec![json!({"id": "none"}), json!({"id": "one", "createdAt": 1})]);
        assert_eq!(resolve_latest(&set).unwrap().record_id(), "one");
    }

    #[test]
    fn test_ties_keep_first_encountered() {
        let set = records(vec![
            json!({"id": "first", "createdAt": 7}),
            json!({"id": "second", "updatedAt": 7}),
            json!({"id": "third"}),
        ]);
        assert_eq!(latest_index(&set), Some(0));

        let untimed = records(vec![json!({"id": "p"}), json!({"id": "q"})]);
        assert_eq!(resolve_latest(&untimed).unwrap().record_id(), "p");
    }

    #[test]
    fn test_take_latest_returns_owned_record() {
        let set = records(vec![
            json!({"id": "a", "createdAt": "2024-01-01T00:00:00Z"}),
            json!({"id": "b", "createdAt": "2024-01-02T00:00:00Z"}),
            json!({"id": "c", "createdAt": "2023-12-31T00:00:00Z"}),
        ]);
        assert_eq!(take_latest(set).unwrap().record_id(), "b");
    }
}
