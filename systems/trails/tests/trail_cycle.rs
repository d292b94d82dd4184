use std::{cell::Cell, rc::Rc};

use botscope_core::{Position, RobotId, RobotState, SnapshotBuffer, SnapshotSource, TeamSnapshot};
use botscope_system_trails::{CycleState, GraphicsSet, TickOutcome, TrailCycle, TrailGraphic};

#[derive(Clone, Debug, Default, PartialEq)]
struct Polyline {
    points: Vec<Position>,
}

impl TrailGraphic for Polyline {
    fn set_points(&mut self, points: &[Position]) {
        self.points = points.to_vec();
    }
}

fn robot(id: u32, x: f32, y: f32) -> RobotState {
    RobotState::new(RobotId::new(id), Position::new(x, y))
}

fn observed_cycle(trail_length: usize) -> (TrailCycle<Polyline>, Rc<Cell<u32>>) {
    let notifications = Rc::new(Cell::new(0));
    let counter = Rc::clone(&notifications);
    let graphics = GraphicsSet::with_observer(move || counter.set(counter.get() + 1));
    (TrailCycle::with_graphics(trail_length, graphics), notifications)
}

fn robot_ids(cycle: &TrailCycle<Polyline>) -> Vec<u32> {
    cycle
        .histories()
        .iter()
        .map(|history| history.robot().get())
        .collect()
}

#[test]
fn first_snapshot_allocates_one_history_per_robot() {
    let (mut cycle, notifications) = observed_cycle(60);
    let mut buffer = SnapshotBuffer::new(5);
    buffer
        .publisher()
        .publish(TeamSnapshot::new(vec![robot(0, 0.0, 0.0), robot(1, 1.0, 1.0)]));

    let outcome = cycle.tick(&mut buffer, Polyline::default);

    assert_eq!(outcome, TickOutcome::Updated { robots: 2 });
    assert_eq!(cycle.state(), CycleState::Tracking);
    assert_eq!(cycle.histories().len(), 2);
    assert_eq!(cycle.graphics().len(), 2);
    assert_eq!(notifications.get(), 1);
}

#[test]
fn robot_joining_later_gets_its_own_history() {
    let (mut cycle, notifications) = observed_cycle(60);
    let _ = cycle.apply(
        &TeamSnapshot::new(vec![robot(0, 0.0, 0.0), robot(1, 1.0, 0.0)]),
        Polyline::default,
    );

    let _ = cycle.apply(
        &TeamSnapshot::new(vec![
            robot(0, 0.5, 0.0),
            robot(1, 1.5, 0.0),
            robot(2, 9.0, 9.0),
        ]),
        Polyline::default,
    );

    assert_eq!(cycle.graphics().len(), 3);
    assert_eq!(robot_ids(&cycle), vec![0, 1, 2]);
    assert_eq!(notifications.get(), 2);

    let newcomer = cycle.graphics().get(2).expect("graphic for third robot");
    assert_eq!(newcomer.points, vec![Position::new(9.0, 9.0)]);
    let veteran = cycle.graphics().get(0).expect("graphic for first robot");
    assert_eq!(
        veteran.points,
        vec![Position::new(0.0, 0.0), Position::new(0.5, 0.0)]
    );
}

#[test]
fn missing_snapshot_retains_previous_trails() {
    let (mut cycle, notifications) = observed_cycle(60);
    let mut source = Some(TeamSnapshot::new(vec![robot(4, 2.0, 3.0)]));
    let _ = cycle.tick(&mut source, Polyline::default);
    let graphics_before = cycle.graphics().as_slice().to_vec();
    let histories_before = cycle.histories().to_vec();

    let outcome = cycle.tick(&mut source, Polyline::default);

    assert_eq!(outcome, TickOutcome::Skipped);
    assert_eq!(cycle.graphics().as_slice(), graphics_before.as_slice());
    assert_eq!(cycle.histories(), histories_before.as_slice());
    assert_eq!(notifications.get(), 1);
}

#[test]
fn departing_robots_lose_their_history() {
    let (mut cycle, _) = observed_cycle(60);
    let _ = cycle.apply(
        &TeamSnapshot::new(vec![
            robot(0, 0.0, 0.0),
            robot(1, 1.0, 0.0),
            robot(2, 2.0, 0.0),
        ]),
        Polyline::default,
    );

    let _ = cycle.apply(
        &TeamSnapshot::new(vec![robot(2, 2.5, 0.0)]),
        Polyline::default,
    );

    assert_eq!(robot_ids(&cycle), vec![2]);
    assert_eq!(cycle.graphics().len(), 1);
    assert!(cycle.history(RobotId::new(0)).is_none());
    let remaining = cycle.graphics().get(0).expect("graphic for surviving robot");
    assert_eq!(
        remaining.points,
        vec![Position::new(2.0, 0.0), Position::new(2.5, 0.0)]
    );

    let _ = cycle.apply(
        &TeamSnapshot::new(vec![robot(2, 3.0, 0.0), robot(0, 7.0, 0.0)]),
        Polyline::default,
    );
    let returning = cycle.history(RobotId::new(0)).expect("robot 0 tracked again");
    assert_eq!(returning.positions().to_vec(), vec![Position::new(7.0, 0.0)]);
}

#[test]
fn reordered_robots_keep_their_trails() {
    let (mut cycle, notifications) = observed_cycle(60);
    let _ = cycle.apply(
        &TeamSnapshot::new(vec![robot(0, 0.0, 0.0), robot(1, 5.0, 5.0)]),
        Polyline::default,
    );

    let _ = cycle.apply(
        &TeamSnapshot::new(vec![robot(1, 6.0, 5.0), robot(0, 1.0, 0.0)]),
        Polyline::default,
    );

    assert_eq!(robot_ids(&cycle), vec![1, 0]);
    assert_eq!(notifications.get(), 1, "count did not change");
    let first = cycle.graphics().get(0).expect("graphic for robot 1");
    assert_eq!(
        first.points,
        vec![Position::new(5.0, 5.0), Position::new(6.0, 5.0)]
    );
}

#[test]
fn trails_are_capped_at_trail_length() {
    let (mut cycle, _) = observed_cycle(3);
    for step in 0..4 {
        let _ = cycle.apply(
            &TeamSnapshot::new(vec![robot(0, step as f32, 0.0)]),
            Polyline::default,
        );
    }

    let graphic = cycle.graphics().get(0).expect("graphic for robot 0");
    assert_eq!(
        graphic.points,
        vec![
            Position::new(1.0, 0.0),
            Position::new(2.0, 0.0),
            Position::new(3.0, 0.0),
        ]
    );
}

#[test]
fn only_latest_buffered_snapshot_is_applied() {
    let (mut cycle, _) = observed_cycle(60);
    let mut buffer = SnapshotBuffer::new(5);
    let publisher = buffer.publisher();
    publisher.publish(TeamSnapshot::new(vec![robot(0, 0.0, 0.0)]));
    publisher.publish(TeamSnapshot::new(vec![robot(0, 1.0, 0.0)]));

    let _ = cycle.tick(&mut buffer, Polyline::default);

    let history = cycle.history(RobotId::new(0)).expect("robot 0 tracked");
    assert_eq!(history.positions().to_vec(), vec![Position::new(1.0, 0.0)]);
    assert!(buffer.try_latest().is_none());
}

#[test]
fn empty_team_clears_graphics() {
    let (mut cycle, notifications) = observed_cycle(60);
    let _ = cycle.apply(
        &TeamSnapshot::new(vec![robot(0, 0.0, 0.0)]),
        Polyline::default,
    );

    let outcome = cycle.apply(&TeamSnapshot::default(), Polyline::default);

    assert_eq!(outcome, TickOutcome::Updated { robots: 0 });
    assert!(cycle.graphics().is_empty());
    assert!(cycle.histories().is_empty());
    assert_eq!(cycle.state(), CycleState::Tracking);
    assert_eq!(notifications.get(), 2);
}
