//! Auto-save coordinator
//!
//! A debounce state machine driven by explicit `Instant` inputs. It never
//! touches a document itself: [`AutoSaveCoordinator::poll`] hands back the
//! order to save and the owner reports the result through
//! [`AutoSaveCoordinator::complete`] or [`AutoSaveCoordinator::fail`].
//!
//! ```text
//! Idle ──change──▶ Pending ──deadline, order changed──▶ Saving ──ok──▶ Saved ──display──▶ Idle
//!                    │  ▲                                  │
//!         unchanged  │  └─────────change───────── Failed ◀─┘ error
//!                    ▼
//!                  Idle
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};

/// Save status shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Pending,
    Saving,
    Saved,
    Failed,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Pending => "pending",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Receives every status transition together with the order it concerns
pub trait StatusObserver: Send {
    fn on_status(&mut self, status: SaveStatus, order: &[usize]);
}

impl<F> StatusObserver for F
where
    F: FnMut(SaveStatus, &[usize]) + Send,
{
    fn on_status(&mut self, status: SaveStatus, order: &[usize]) {
        self(status, order)
    }
}

/// Last successfully saved order and the current status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSnapshot {
    pub order: Vec<usize>,
    pub status: SaveStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Pending { deadline: Instant },
    Saving,
    Saved { until: Instant },
    Failed,
}

pub struct AutoSaveCoordinator {
    debounce: Duration,
    saved_display: Duration,
    phase: Phase,
    snapshot: SaveSnapshot,
    /// Order handed out by the running save
    in_flight: Option<Vec<usize>>,
    /// Time of the latest change seen while a save was running
    latched_change: Option<Instant>,
    observer: Option<Box<dyn StatusObserver>>,
}

impl fmt::Debug for AutoSaveCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSaveCoordinator")
            .field("debounce", &self.debounce)
            .field("saved_display", &self.saved_display)
            .field("phase", &self.phase)
            .field("snapshot", &self.snapshot)
            .field("in_flight", &self.in_flight)
            .field("latched_change", &self.latched_change)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl AutoSaveCoordinator {
    pub fn new(debounce: Duration, saved_display: Duration) -> Self {
        Self {
            debounce,
            saved_display,
            phase: Phase::Idle,
            snapshot: SaveSnapshot {
                order: Vec::new(),
                status: SaveStatus::Idle,
            },
            in_flight: None,
            latched_change: None,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn StatusObserver>) {
        self.observer = Some(observer);
    }

    /// Replace the order that counts as already saved
    pub fn set_baseline(&mut self, order: Vec<usize>) {
        self.snapshot.order = order;
    }

    pub fn baseline(&self) -> &[usize] {
        &self.snapshot.order
    }

    pub fn snapshot(&self) -> &SaveSnapshot {
        &self.snapshot
    }

    pub fn status(&self) -> SaveStatus {
        self.snapshot.status
    }

    pub fn is_saving(&self) -> bool {
        self.phase == Phase::Saving
    }

    /// No save running and none scheduled
    pub fn is_settled(&self) -> bool {
        !matches!(self.phase, Phase::Saving | Phase::Pending { .. })
    }

    /// Next instant at which [`poll`](Self::poll) has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Pending { deadline } => Some(deadline),
            Phase::Saved { until } => Some(until),
            _ => None,
        }
    }

    /// Deadline of a scheduled but not yet started save
    pub fn pending_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Record that the order may have changed.
    ///
    /// Restarts the debounce timer. While a save is running the change is
    /// latched and serviced once that save finishes.
    pub fn notify_change(&mut self, now: Instant, current_order: &[usize]) {
        match self.phase {
            Phase::Saving => {
                debug!("change during save, latched");
                self.latched_change = Some(now);
            }
            Phase::Pending { .. } => {
                self.phase = Phase::Pending { deadline: now + self.debounce };
            }
            Phase::Idle | Phase::Saved { .. } | Phase::Failed => {
                self.phase = Phase::Pending { deadline: now + self.debounce };
                self.emit(SaveStatus::Pending, current_order);
            }
        }
    }

    /// Advance timers. Returns the order to save when a save should start.
    pub fn poll(&mut self, now: Instant, current_order: &[usize]) -> Option<Vec<usize>> {
        match self.phase {
            Phase::Pending { deadline } if now >= deadline => {
                if current_order == self.snapshot.order.as_slice() {
                    debug!("order unchanged since last save, skipping");
                    self.phase = Phase::Idle;
                    let baseline = self.snapshot.order.clone();
                    self.emit(SaveStatus::Idle, &baseline);
                    None
                } else {
                    self.start(current_order);
                    Some(current_order.to_vec())
                }
            }
            Phase::Saved { until } if now >= until => {
                self.phase = Phase::Idle;
                let baseline = self.snapshot.order.clone();
                self.emit(SaveStatus::Idle, &baseline);
                None
            }
            _ => None,
        }
    }

    /// Start a save right away, bypassing the debounce and the unchanged check
    pub fn begin_manual(&mut self, current_order: &[usize]) -> Result<()> {
        if self.is_saving() {
            return Err(Error::General("a save is already running".to_string()));
        }
        self.start(current_order);
        Ok(())
    }

    fn start(&mut self, order: &[usize]) {
        self.phase = Phase::Saving;
        self.in_flight = Some(order.to_vec());
        self.emit(SaveStatus::Saving, order);
    }

    /// The running save succeeded.
    ///
    /// `new_baseline` is the saved order expressed in the new document's
    /// page indices; `current_order` is the order now on screen.
    pub fn complete(&mut self, now: Instant, new_baseline: Vec<usize>, current_order: &[usize]) {
        let saved = self.in_flight.take().unwrap_or_else(|| new_baseline.clone());
        self.snapshot.order = new_baseline;
        self.phase = Phase::Saved { until: now + self.saved_display };
        self.emit(SaveStatus::Saved, &saved);
        self.resume_latched(current_order);
    }

    /// The running save failed. The on-screen order is left alone.
    pub fn fail(&mut self, current_order: &[usize]) {
        let attempted = self.in_flight.take().unwrap_or_else(|| current_order.to_vec());
        self.phase = Phase::Failed;
        self.emit(SaveStatus::Failed, &attempted);
        self.resume_latched(current_order);
    }

    fn resume_latched(&mut self, current_order: &[usize]) {
        if let Some(changed_at) = self.latched_change.take() {
            self.phase = Phase::Pending { deadline: changed_at + self.debounce };
            self.emit(SaveStatus::Pending, current_order);
        }
    }

    fn emit(&mut self, status: SaveStatus, order: &[usize]) {
        debug!(%status, ?order, "save status");
        self.snapshot.status = status;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_status(status, order);
        }
    }
}
