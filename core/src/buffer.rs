//! Bounded most-recent-wins hand-off between a publishing thread and a poller.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::SnapshotSource;

/// Number of values a [`SnapshotBuffer`] queues when no size is configured.
pub const DEFAULT_SNAPSHOT_BUFFER_SIZE: usize = 5;

/// Bounded buffer whose consumer only ever observes the newest value.
///
/// Publishers never block: once the buffer is full the oldest queued value is
/// evicted to make room. The consumer drains everything pending and keeps the
/// last value, so a slow consumer skips stale snapshots instead of falling
/// behind.
#[derive(Debug)]
pub struct SnapshotBuffer<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> SnapshotBuffer<T> {
    /// Creates a buffer that queues at most `capacity` values (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Hands out a publishing handle that may be moved to another thread.
    #[must_use]
    pub fn publisher(&self) -> SnapshotPublisher<T> {
        SnapshotPublisher {
            sender: self.sender.clone(),
            evictor: self.receiver.clone(),
        }
    }

    /// Number of values waiting to be drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl<T> Default for SnapshotBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_BUFFER_SIZE)
    }
}

impl<T> SnapshotSource<T> for SnapshotBuffer<T> {
    fn try_latest(&mut self) -> Option<T> {
        self.receiver.try_iter().last()
    }
}

/// Publishing side of a [`SnapshotBuffer`].
#[derive(Debug)]
pub struct SnapshotPublisher<T> {
    sender: Sender<T>,
    evictor: Receiver<T>,
}

impl<T> Clone for SnapshotPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            evictor: self.evictor.clone(),
        }
    }
}

impl<T> SnapshotPublisher<T> {
    /// Publishes a value, evicting the oldest queued value when the buffer is full.
    pub fn publish(&self, value: T) {
        let mut value = value;
        loop {
            match self.sender.try_send(value) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.evictor.try_recv();
                    value = rejected;
                }
                // The publisher owns a receiver, so the channel cannot disconnect.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}
