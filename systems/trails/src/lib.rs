#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns team snapshots into per-robot position trails.
//!
//! Each refresh tick polls a [`SnapshotSource`] without blocking, appends the
//! reported robot positions to bounded per-robot histories and rewrites one
//! drawable graphic per robot from those histories. The system owns both the
//! histories and the graphics; the snapshot itself is only read.

mod graphics;
mod history;

use std::collections::HashMap;

use botscope_core::{Position, RobotId, SnapshotSource, TeamSnapshot};
use tracing::debug;

pub use graphics::{GraphicsSet, ResizeObserver};
pub use history::HistoryQueue;

/// Number of positions retained per robot when no length is configured.
pub const DEFAULT_TRAIL_LENGTH: usize = 60;

/// Drawable handle whose displayed outline can be replaced.
pub trait TrailGraphic {
    /// Replaces the displayed points, ordered from oldest to newest.
    fn set_points(&mut self, points: &[Position]);
}

/// Lifecycle of a [`TrailCycle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleState {
    /// No snapshot has been received yet.
    Uninitialized,
    /// At least one snapshot has been received and histories are allocated.
    Tracking,
}

/// Result of a single [`TrailCycle::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    /// No new snapshot was available; trails were left untouched.
    Skipped,
    /// A snapshot was applied.
    Updated {
        /// Number of robots reported by the applied snapshot.
        robots: usize,
    },
}

/// Position history recorded for a single robot.
#[derive(Clone, Debug, PartialEq)]
pub struct TrailHistory {
    robot: RobotId,
    positions: HistoryQueue<Position>,
}

impl TrailHistory {
    fn new(robot: RobotId, trail_length: usize) -> Self {
        Self {
            robot,
            positions: HistoryQueue::new(trail_length),
        }
    }

    /// Robot the history belongs to.
    #[must_use]
    pub const fn robot(&self) -> RobotId {
        self.robot
    }

    /// Recorded positions, oldest first.
    #[must_use]
    pub fn positions(&self) -> &HistoryQueue<Position> {
        &self.positions
    }
}

/// Trail update cycle keeping one history and one graphic per tracked robot.
///
/// Histories are keyed by [`RobotId`] and kept in snapshot order, so slot `i`
/// of [`TrailCycle::histories`] always pairs with graphic `i` and with robot
/// `i` of the most recently applied snapshot. Robots that join receive an
/// empty history, robots that leave have theirs discarded, and robots that
/// merely change position in the list keep their trail.
#[derive(Debug)]
pub struct TrailCycle<G> {
    trail_length: usize,
    state: CycleState,
    histories: Vec<TrailHistory>,
    graphics: GraphicsSet<G>,
    scratch: Vec<Position>,
}

impl<G: TrailGraphic> TrailCycle<G> {
    /// Creates an uninitialised cycle retaining `trail_length` positions per robot.
    #[must_use]
    pub fn new(trail_length: usize) -> Self {
        Self::with_graphics(trail_length, GraphicsSet::new())
    }

    /// Creates an uninitialised cycle that manages the provided graphics set.
    ///
    /// Useful for registering a resize observer up front.
    #[must_use]
    pub fn with_graphics(trail_length: usize, graphics: GraphicsSet<G>) -> Self {
        Self {
            trail_length: trail_length.max(1),
            state: CycleState::Uninitialized,
            histories: Vec::new(),
            graphics,
            scratch: Vec::new(),
        }
    }

    /// Registers the callback fired whenever the number of graphics changes.
    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut() + 'static,
    {
        self.graphics.set_observer(observer);
    }

    /// Polls `source` and applies the snapshot if one is available.
    ///
    /// `factory` builds default-styled graphics for newly tracked robots. When
    /// the source has nothing new the previous trails are retained unchanged.
    pub fn tick<S, F>(&mut self, source: &mut S, factory: F) -> TickOutcome
    where
        S: SnapshotSource<TeamSnapshot> + ?Sized,
        F: FnMut() -> G,
    {
        match source.try_latest() {
            Some(snapshot) => self.apply(&snapshot, factory),
            None => TickOutcome::Skipped,
        }
    }

    /// Applies a snapshot directly, bypassing the source.
    pub fn apply<F>(&mut self, snapshot: &TeamSnapshot, factory: F) -> TickOutcome
    where
        F: FnMut() -> G,
    {
        if self.state == CycleState::Uninitialized {
            debug!(robots = snapshot.len(), "first team snapshot received");
            self.state = CycleState::Tracking;
        }

        self.reconcile(snapshot);
        self.graphics.resize(snapshot.len(), factory);

        for (history, robot) in self.histories.iter_mut().zip(&snapshot.robots) {
            history.positions.push(robot.position);
        }

        for (graphic, history) in self.graphics.iter_mut().zip(&self.histories) {
            self.scratch.clear();
            self.scratch.extend(history.positions.contents().copied());
            graphic.set_points(&self.scratch);
        }

        TickOutcome::Updated {
            robots: snapshot.len(),
        }
    }

    /// Aligns the histories with the robots listed by `snapshot`.
    fn reconcile(&mut self, snapshot: &TeamSnapshot) {
        let unchanged = self.histories.len() == snapshot.len()
            && self
                .histories
                .iter()
                .zip(&snapshot.robots)
                .all(|(history, robot)| history.robot == robot.id);
        if unchanged {
            return;
        }

        let previous_count = self.histories.len();
        let mut previous: HashMap<RobotId, TrailHistory> = self
            .histories
            .drain(..)
            .map(|history| (history.robot, history))
            .collect();

        let trail_length = self.trail_length;
        self.histories.extend(snapshot.robots.iter().map(|robot| {
            previous
                .remove(&robot.id)
                .unwrap_or_else(|| TrailHistory::new(robot.id, trail_length))
        }));

        debug!(
            previous = previous_count,
            current = self.histories.len(),
            discarded = previous.len(),
            "reconciled robot trail histories"
        );
    }
}

impl<G> TrailCycle<G> {
    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CycleState {
        self.state
    }

    /// Number of positions retained per robot.
    #[must_use]
    pub const fn trail_length(&self) -> usize {
        self.trail_length
    }

    /// Graphics currently managed by the cycle, one per tracked robot.
    #[must_use]
    pub fn graphics(&self) -> &GraphicsSet<G> {
        &self.graphics
    }

    /// Histories of the tracked robots in snapshot order.
    #[must_use]
    pub fn histories(&self) -> &[TrailHistory] {
        &self.histories
    }

    /// History recorded for `robot`, if it is tracked.
    #[must_use]
    pub fn history(&self, robot: RobotId) -> Option<&TrailHistory> {
        self.histories.iter().find(|history| history.robot == robot)
    }
}
