//! Change detection
//!
//! Decides, for each poll result, whether it is the boot record, something
//! already handled, or a new record to put on screen.

use rollcall_common::record::AttendanceRecord;
use rollcall_common::{extract_identity, DisplayedIdentity};
use tokio::time::Instant;

use crate::slot::DisplaySlot;

/// One poll result, reduced to what detection needs
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub record_id: String,
    /// `max(createdAt, updatedAt)` in epoch milliseconds, when known
    pub recency: Option<i64>,
    pub identity: DisplayedIdentity,
}

impl Observation {
    pub fn from_record(record: &AttendanceRecord) -> Self {
        Self {
            record_id: record.record_id(),
            recency: record.recency_millis(),
            identity: extract_identity(record.fields()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Its dwell already elapsed
    Expired,
    /// It is the record on screen, or the boot record
    AlreadyShown,
    /// Older than the last record shown; a late response
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Boot,
    Ignore(IgnoreReason),
    New,
}

/// Classify an observation against the slot's memory. Pure.
pub fn detect(slot: &DisplaySlot, observation: &Observation) -> Decision {
    if slot.initialized_record_id().is_none() {
        return Decision::Boot;
    }

    let id = observation.record_id.as_str();
    if slot.expired_record_id() == Some(id) {
        return Decision::Ignore(IgnoreReason::Expired);
    }
    if slot.last_shown_record_id() == Some(id) {
        return Decision::Ignore(IgnoreReason::AlreadyShown);
    }

    if let (Some(seen), Some(last)) = (observation.recency, slot.last_shown_timestamp()) {
        if seen < last {
            return Decision::Ignore(IgnoreReason::Stale);
        }
    }

    Decision::New
}

/// Detect and apply the decision to the slot
pub fn apply(slot: &mut DisplaySlot, observation: Observation, now: Instant) -> Decision {
    let decision = detect(slot, &observation);
    match decision {
        Decision::Boot => slot.remember(observation.record_id, observation.recency),
        Decision::New => slot.show(
            observation.record_id,
            observation.recency,
            observation.identity,
            now,
        ),
        Decision::Ignore(_) => {}
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{SlotState, DEFAULT_DWELL};
    use serde_json::json;
    use std::time::Duration;

    fn observation(id: &str, recency: Option<i64>) -> Observation {
        Observation {
            record_id: id.to_string(),
            recency,
            identity: DisplayedIdentity {
                name: format!("Person {}", id),
                company: "Co".to_string(),
                position: "Pos".to_string(),
                image_url: None,
            },
        }
    }

    fn booted(id: &str, recency: Option<i64>) -> DisplaySlot {
        let mut slot = DisplaySlot::default();
        assert_eq!(
            apply(&mut slot, observation(id, recency), Instant::now()),
            Decision::Boot
        );
        slot
    }

    #[test]
    fn test_from_record_uses_id_recency_and_identity() {
        let record = AttendanceRecord::from_value(json!({
            "id": "r1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "createdAt": 1000,
            "updatedAt": 2000
        }))
        .unwrap();

        let obs = Observation::from_record(&record);
        assert_eq!(obs.record_id, "r1");
        assert_eq!(obs.recency, Some(2000));
        assert_eq!(obs.identity.name, "Ada Lovelace");
    }

    #[test]
    fn test_first_observation_is_boot_and_not_shown() {
        let slot = booted("a", Some(10));
        assert_eq!(slot.state(), SlotState::Idle);
        assert_eq!(slot.initialized_record_id(), Some("a"));
    }

    #[test]
    fn test_boot_record_repeated_is_ignored() {
        let mut slot = booted("a", Some(10));
        for _ in 0..5 {
            let decision = apply(&mut slot, observation("a", Some(10)), Instant::now());
            assert_eq!(decision, Decision::Ignore(IgnoreReason::AlreadyShown));
        }
        assert_eq!(slot.state(), SlotState::Idle);
    }

    #[test]
    fn test_new_record_shown_exactly_once() {
        let mut slot = booted("a", Some(10));
        let now = Instant::now();

        assert_eq!(apply(&mut slot, observation("b", Some(20)), now), Decision::New);
        assert_eq!(slot.current().unwrap().name, "Person b");
        let pending = slot.pending_expiry().unwrap();

        // Repeated polls during the dwell do not restart it
        for _ in 0..10 {
            assert_eq!(
                apply(&mut slot, observation("b", Some(20)), now + Duration::from_secs(1)),
                Decision::Ignore(IgnoreReason::AlreadyShown)
            );
        }
        assert_eq!(slot.pending_expiry(), Some(pending));
    }

    #[test]
    fn test_expired_record_is_never_resurrected() {
        let mut slot = booted("a", Some(10));
        let now = Instant::now();
        apply(&mut slot, observation("b", Some(20)), now);
        assert!(slot.expire_due(now + DEFAULT_DWELL));

        for _ in 0..10 {
            assert_eq!(
                apply(&mut slot, observation("b", Some(20)), now + DEFAULT_DWELL),
                Decision::Ignore(IgnoreReason::Expired)
            );
        }
        assert_eq!(slot.state(), SlotState::Idle);
    }

    #[test]
    fn test_preemption_restarts_dwell() {
        let mut slot = booted("a", Some(10));
        let t0 = Instant::now();
        apply(&mut slot, observation("b", Some(20)), t0);

        let t5 = t0 + Duration::from_secs(5);
        assert_eq!(apply(&mut slot, observation("c", Some(30)), t5), Decision::New);
        assert_eq!(slot.current().unwrap().name, "Person c");

        // B's original deadline passes without effect
        assert!(!slot.expire_due(t0 + DEFAULT_DWELL));
        assert_eq!(slot.state(), SlotState::Showing);
        assert!(slot.expired_record_id().is_none());

        assert!(slot.expire_due(t5 + DEFAULT_DWELL));
        assert_eq!(slot.expired_record_id(), Some("c"));
    }

    #[test]
    fn test_stale_observation_is_discarded() {
        let mut slot = booted("a", Some(10));
        let now = Instant::now();
        apply(&mut slot, observation("c", Some(30)), now);

        // A late response carrying an older record
        assert_eq!(
            apply(&mut slot, observation("b", Some(20)), now),
            Decision::Ignore(IgnoreReason::Stale)
        );
        assert_eq!(slot.current().unwrap().name, "Person c");
    }

    #[test]
    fn test_unknown_recency_is_not_stale() {
        let mut slot = booted("a", Some(10));
        assert_eq!(
            apply(&mut slot, observation("b", None), Instant::now()),
            Decision::New
        );

        let mut slot = booted("a", None);
        assert_eq!(
            apply(&mut slot, observation("b", Some(1)), Instant::now()),
            Decision::New
        );
    }

    #[test]
    fn test_reset_makes_next_observation_boot() {
        let mut slot = booted("a", Some(10));
        apply(&mut slot, observation("b", Some(20)), Instant::now());
        slot.reset();

        assert_eq!(
            apply(&mut slot, observation("b", Some(20)), Instant::now()),
            Decision::Boot
        );
        assert_eq!(slot.state(), SlotState::Idle);
    }

    #[test]
    fn test_new_after_expiry_clears_expired_marker() {
        let mut slot = booted("a", Some(10));
        let now = Instant::now();
        apply(&mut slot, observation("b", Some(20)), now);
        slot.expire_due(now + DEFAULT_DWELL);

        assert_eq!(
            apply(&mut slot, observation("c", Some(30)), now + DEFAULT_DWELL),
            Decision::New
        );
        assert!(slot.expired_record_id().is_none());
    }
}
