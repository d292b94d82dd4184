use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::Instant,
};

use botscope_core::{RobotStatus, DISCONNECT_DURATION};
use tracing::{debug, warn};

/// Number of most recent sequence numbers considered when estimating loss.
pub const RECENT_LOSS_PERIOD: u64 = 100;

/// How a sequence number was handled by a [`PacketLossTracker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SequenceOutcome {
    /// The sequence number was newer than every tracked one.
    Accepted,
    /// The sequence number was not newer than the last tracked one and was dropped.
    Ignored,
    /// The sequence number was far behind the tracked window, so tracking restarted.
    Reset,
}

/// Estimates message loss from the sequence numbers of received messages.
#[derive(Clone, Debug)]
pub struct PacketLossTracker {
    label: &'static str,
    recent: VecDeque<u64>,
    loss_rate: f32,
    last_valid: bool,
}

impl PacketLossTracker {
    /// Creates a tracker for messages described by `label` in log output.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            recent: VecDeque::with_capacity(RECENT_LOSS_PERIOD as usize),
            loss_rate: 0.0,
            last_valid: false,
        }
    }

    /// Records the sequence number of a newly received message.
    pub fn observe(&mut self, sequence_number: u64) -> SequenceOutcome {
        let mut outcome = SequenceOutcome::Accepted;
        if let Some(&newest) = self.recent.back() {
            if sequence_number.saturating_add(RECENT_LOSS_PERIOD) <= newest {
                // A sender restart rewinds its counter.
                warn!(
                    messages = self.label,
                    sequence_number, newest, "old message received, resetting sequence tracking"
                );
                self.recent.clear();
                outcome = SequenceOutcome::Reset;
            } else if sequence_number <= newest {
                self.last_valid = false;
                return SequenceOutcome::Ignored;
            }
        }

        self.recent.push_back(sequence_number);
        while let Some(&oldest) = self.recent.front() {
            if sequence_number - oldest < RECENT_LOSS_PERIOD {
                break;
            }
            let _ = self.recent.pop_front();
        }

        let expected = sequence_number.saturating_add(1).min(RECENT_LOSS_PERIOD);
        let lost = expected.saturating_sub(self.recent.len() as u64);
        self.loss_rate = lost as f32 / expected as f32;
        self.last_valid = true;
        outcome
    }

    /// Share of messages lost within the recent window, between 0.0 and 1.0.
    #[must_use]
    pub fn loss_rate(&self) -> f32 {
        self.loss_rate
    }

    /// Whether the most recently observed message was accepted.
    #[must_use]
    pub fn is_last_valid(&self) -> bool {
        self.last_valid
    }
}

/// Immutable record of the latest robot status and when it arrived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusEntry {
    /// Status reported by the robot.
    pub status: RobotStatus,
    /// Instant the status was received locally.
    pub received_at: Instant,
    /// Share of status messages lost in transit, between 0.0 and 1.0.
    pub status_loss_rate: f32,
}

impl StatusEntry {
    /// Whether the robot has reported recently enough to count as connected.
    #[must_use]
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.received_at) < DISCONNECT_DURATION
    }
}

/// Latest robot status shared between the receiving thread and the shell.
///
/// Each accepted status replaces the previous entry wholesale, so readers
/// always observe a consistent record.
#[derive(Debug)]
pub struct StatusBoard {
    latest: RwLock<Option<Arc<StatusEntry>>>,
    tracker: Mutex<PacketLossTracker>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
            tracker: Mutex::new(PacketLossTracker::new("robot status")),
        }
    }

    /// Records a status received at `received_at`.
    ///
    /// Statuses that are not newer than the current one are dropped.
    pub fn record(&self, status: RobotStatus, received_at: Instant) {
        let (outcome, status_loss_rate) = {
            let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
            let outcome = tracker.observe(status.sequence_number);
            (outcome, tracker.loss_rate())
        };

        if outcome == SequenceOutcome::Ignored {
            debug!(
                sequence_number = status.sequence_number,
                "dropping out-of-order robot status"
            );
            return;
        }

        let entry = Arc::new(StatusEntry {
            status,
            received_at,
            status_loss_rate,
        });
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    /// Most recently accepted status, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<StatusEntry>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
