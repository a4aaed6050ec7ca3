//! Display slot state machine
//!
//! One slot, one identity at a time. States are `Idle` and `Showing`; entering
//! `Showing` arms a dwell deadline, and the deadline firing returns the slot
//! to `Idle` while remembering the record that just left as expired.
//!
//! The slot also carries the detector's memory (last shown, expired and
//! boot-time record ids). That memory outlives `Showing`, so a late or
//! repeated poll result cannot bring an old record back.
//!
//! Timers are not owned here: the slot holds a single [`PendingExpiry`] value
//! and whoever drives it sleeps until that deadline. Replacing the value is
//! the cancellation.

use chrono::{DateTime, Utc};
use rollcall_common::DisplayedIdentity;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How long an identity stays on screen
pub const DEFAULT_DWELL: Duration = Duration::from_secs(20);

/// Longest dwell a slot accepts; longer values are clamped
pub const MAX_DWELL: Duration = Duration::from_secs(3600);

/// Visible state of the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Nothing on screen; the kiosk shows its waiting prompt
    Idle,
    /// An identity is on screen until its dwell deadline
    Showing,
}

/// The one outstanding dwell deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingExpiry {
    /// Incremented on every entry to `Showing`; an expiry only fires for the current generation
    pub generation: u64,
    pub deadline: Instant,
}

/// What is on screen right now
#[derive(Debug, Clone, PartialEq)]
struct Shown {
    identity: DisplayedIdentity,
    /// `None` for operator test displays
    record_id: Option<String>,
    shown_at: DateTime<Utc>,
}

/// Serializable view of the slot, published to the kiosk page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySnapshot {
    pub state: SlotState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<DisplayedIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shown_at: Option<DateTime<Utc>>,
}

impl DisplaySnapshot {
    pub fn idle() -> Self {
        Self {
            state: SlotState::Idle,
            identity: None,
            record_id: None,
            shown_at: None,
        }
    }
}

/// Single-slot display state plus change-detection memory
#[derive(Debug)]
pub struct DisplaySlot {
    dwell: Duration,
    current: Option<Shown>,
    last_shown_record_id: Option<String>,
    last_shown_timestamp: Option<i64>,
    expired_record_id: Option<String>,
    initialized_record_id: Option<String>,
    pending_expiry: Option<PendingExpiry>,
    generation: u64,
}

impl DisplaySlot {
    pub fn new(dwell: Duration) -> Self {
        Self {
            dwell: dwell.min(MAX_DWELL),
            current: None,
            last_shown_record_id: None,
            last_shown_timestamp: None,
            expired_record_id: None,
            initialized_record_id: None,
            pending_expiry: None,
            generation: 0,
        }
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    pub fn state(&self) -> SlotState {
        if self.current.is_some() {
            SlotState::Showing
        } else {
            SlotState::Idle
        }
    }

    pub fn current(&self) -> Option<&DisplayedIdentity> {
        self.current.as_ref().map(|shown| &shown.identity)
    }

    pub fn last_shown_record_id(&self) -> Option<&str> {
        self.last_shown_record_id.as_deref()
    }

    pub fn last_shown_timestamp(&self) -> Option<i64> {
        self.last_shown_timestamp
    }

    pub fn expired_record_id(&self) -> Option<&str> {
        self.expired_record_id.as_deref()
    }

    pub fn initialized_record_id(&self) -> Option<&str> {
        self.initialized_record_id.as_deref()
    }

    pub fn pending_expiry(&self) -> Option<PendingExpiry> {
        self.pending_expiry
    }

    /// Boot: adopt the record that already existed as "seen" without showing it
    pub fn remember(&mut self, record_id: String, timestamp: Option<i64>) {
        debug!(record_id = %record_id, "Boot record remembered, not displayed");
        self.initialized_record_id = Some(record_id.clone());
        self.last_shown_record_id = Some(record_id);
        self.last_shown_timestamp = timestamp;
    }

    /// Enter `Showing` for a newly detected record
    ///
    /// Clears the expired marker and replaces any pending expiry, so the new
    /// record always gets the full dwell measured from `now`.
    pub fn show(
        &mut self,
        record_id: String,
        timestamp: Option<i64>,
        identity: DisplayedIdentity,
        now: Instant,
    ) {
        self.expired_record_id = None;
        self.last_shown_record_id = Some(record_id.clone());
        self.last_shown_timestamp = timestamp;
        self.enter_showing(identity, Some(record_id), now);
    }

    /// Operator test display: shows an identity for one dwell without touching record memory
    pub fn show_test(&mut self, identity: DisplayedIdentity, now: Instant) {
        self.enter_showing(identity, None, now);
    }

    fn enter_showing(&mut self, identity: DisplayedIdentity, record_id: Option<String>, now: Instant) {
        self.generation += 1;
        // An unrepresentable deadline expires on the next driver turn
        let deadline = now.checked_add(self.dwell).unwrap_or(now);
        self.pending_expiry = Some(PendingExpiry {
            generation: self.generation,
            deadline,
        });
        self.current = Some(Shown {
            identity,
            record_id,
            shown_at: Utc::now(),
        });
    }

    /// Fire the dwell expiry of `generation`
    ///
    /// Returns `false` (and changes nothing) when that expiry has been
    /// superseded or cancelled.
    pub fn expire(&mut self, generation: u64) -> bool {
        match self.pending_expiry {
            Some(pending) if pending.generation == generation => {
                self.pending_expiry = None;
                self.current = None;
                if let Some(id) = &self.last_shown_record_id {
                    self.expired_record_id = Some(id.clone());
                }
                debug!(expired = ?self.expired_record_id, "Dwell elapsed, slot idle");
                true
            }
            _ => false,
        }
    }

    /// Fire the pending expiry if its deadline has passed
    pub fn expire_due(&mut self, now: Instant) -> bool {
        match self.pending_expiry {
            Some(pending) if pending.deadline <= now => self.expire(pending.generation),
            _ => false,
        }
    }

    /// Operator reset: back to `Idle` with all history forgotten
    ///
    /// The pending expiry is dropped here, in the same step, so it can never
    /// fire against a later record.
    pub fn reset(&mut self) {
        self.pending_expiry = None;
        self.current = None;
        self.last_shown_record_id = None;
        self.last_shown_timestamp = None;
        self.expired_record_id = None;
        self.initialized_record_id = None;
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        match &self.current {
            Some(shown) => DisplaySnapshot {
                state: SlotState::Showing,
                identity: Some(shown.identity.clone()),
                record_id: shown.record_id.clone(),
                shown_at: Some(shown.shown_at),
            },
            None => DisplaySnapshot::idle(),
        }
    }
}

impl Default for DisplaySlot {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL)
    }
}
