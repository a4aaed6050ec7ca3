//! Display driver
//!
//! A single task owns the [`DisplaySlot`] and is its only mutator. It selects
//! over poll ticks, the pending dwell deadline, operator commands and
//! cancellation, so none of those can interleave inside a transition.
//! Observers read the published [`DisplaySnapshot`] through a `watch` channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rollcall_common::record::unwrap_envelope;
use rollcall_common::DisplayedIdentity;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::detector::{self, Decision, Observation};
use crate::error::{DisplayError, Result};
use crate::poller::{self, LatestSource, Tick};
use crate::slot::{DisplaySlot, DisplaySnapshot, DEFAULT_DWELL};

/// Operator command queue depth
const COMMAND_BUFFER: usize = 16;

/// Poll cadence and dwell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTiming {
    pub poll_interval: Duration,
    pub dwell: Duration,
}

impl Default for DisplayTiming {
    fn default() -> Self {
        Self {
            poll_interval: poller::DEFAULT_POLL_INTERVAL,
            dwell: DEFAULT_DWELL,
        }
    }
}

/// Operator commands handled by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    ShowTest,
}

/// Identity shown by the operator test display
pub fn test_identity() -> DisplayedIdentity {
    DisplayedIdentity {
        name: "Test User".to_string(),
        company: "Test Company".to_string(),
        position: "Test Position".to_string(),
        image_url: None,
    }
}

/// Cloneable access to a running display: send commands, read state
#[derive(Clone)]
pub struct DisplayHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<DisplaySnapshot>,
}

impl DisplayHandle {
    pub fn snapshot(&self) -> DisplaySnapshot {
        self.snapshots.borrow().clone()
    }

    /// New receiver for change notifications (SSE)
    pub fn subscribe(&self) -> watch::Receiver<DisplaySnapshot> {
        self.snapshots.clone()
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    pub async fn show_test(&self) -> Result<()> {
        self.send(Command::ShowTest).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DisplayError::Stopped)
    }
}

/// Running driver; dropping it leaves the task running until [`shutdown`](Self::shutdown)
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    handle: DisplayHandle,
}

impl PollerHandle {
    pub fn display(&self) -> DisplayHandle {
        self.handle.clone()
    }

    /// Token that stops the driver when cancelled
    ///
    /// Stopping the driver also ends every open SSE stream.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the driver and wait for it to exit; the slot is dropped with it
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Display driver ended abnormally: {}", e);
        }
    }
}

/// Arms the display driver, at most once at a time
pub struct DisplayController {
    source: Arc<dyn LatestSource>,
    timing: DisplayTiming,
    armed: Arc<AtomicBool>,
}

impl DisplayController {
    pub fn new(source: Arc<dyn LatestSource>, timing: DisplayTiming) -> Self {
        Self {
            source,
            timing,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Spawn the driver task with a fresh slot
    ///
    /// Fails with [`DisplayError::AlreadyArmed`] while a previous driver is
    /// still running. The flag clears when that driver exits.
    pub fn arm(&self) -> Result<PollerHandle> {
        if self
            .armed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DisplayError::AlreadyArmed);
        }

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(DisplaySnapshot::idle());
        let cancel = CancellationToken::new();

        let driver = Driver {
            source: Arc::clone(&self.source),
            slot: DisplaySlot::new(self.timing.dwell),
            commands: command_rx,
            snapshots: snapshot_tx,
        };

        let armed = Arc::clone(&self.armed);
        let task_cancel = cancel.clone();
        let poll_interval = self.timing.poll_interval;
        let task = tokio::spawn(async move {
            let _armed = ArmedGuard(armed);
            driver.run(poll_interval, task_cancel).await;
        });

        info!(
            poll_interval_ms = poll_interval.as_millis() as u64,
            dwell_secs = self.timing.dwell.as_secs(),
            "Display armed"
        );

        Ok(PollerHandle {
            cancel,
            task,
            handle: DisplayHandle {
                commands: command_tx,
                snapshots: snapshot_rx,
            },
        })
    }
}

/// Clears the armed flag however the driver task ends, panics included
struct ArmedGuard(Arc<AtomicBool>);

impl Drop for ArmedGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Driver {
    source: Arc<dyn LatestSource>,
    slot: DisplaySlot,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<DisplaySnapshot>,
}

impl Driver {
    async fn run(mut self, poll_interval: Duration, cancel: CancellationToken) {
        let mut ticks = poller::ticks(poll_interval);

        loop {
            let deadline = self.slot.pending_expiry().map(|pending| pending.deadline);

            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(tick) = ticks.next() => self.poll_once(tick).await,
                _ = expiry(deadline) => {
                    self.slot.expire_due(Instant::now());
                }
                Some(command) = self.commands.recv() => self.handle(command),
            }

            self.publish();
        }

        debug!("Display driver stopped");
    }

    /// One poll cycle: fetch, settle due expiry, detect, apply
    async fn poll_once(&mut self, tick: Tick) {
        let body = match self.source.fetch_latest().await {
            Ok(Some(body)) => body,
            Ok(None) => return,
            Err(e) => {
                warn!(seq = tick.seq, "Poll failed: {}", e);
                return;
            }
        };

        // The dwell may have elapsed while the fetch was in flight
        let now = Instant::now();
        self.slot.expire_due(now);

        let Some(record) = unwrap_envelope(body) else {
            debug!(seq = tick.seq, "Poll response held no record");
            return;
        };

        let observation = Observation::from_record(&record);
        let record_id = observation.record_id.clone();
        match detector::apply(&mut self.slot, observation, now) {
            Decision::Boot => info!(record_id = %record_id, "Existing record adopted at startup"),
            Decision::New => info!(
                record_id = %record_id,
                name = ?self.slot.current().map(|identity| identity.name.as_str()),
                "Displaying new attendance"
            ),
            Decision::Ignore(reason) => {
                debug!(seq = tick.seq, record_id = %record_id, ?reason, "Observation ignored")
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Reset => {
                self.slot.reset();
                info!("Display reset by operator");
            }
            Command::ShowTest => {
                self.slot.show_test(test_identity(), Instant::now());
                info!("Test display shown");
            }
        }
    }

    fn publish(&self) {
        let next = self.slot.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Sleep until the deadline, or forever when nothing is pending
async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
