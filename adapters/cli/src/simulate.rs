use std::{f32::consts::TAU, thread, time::Duration};

use anyhow::{Context, Result};
use botscope_core::{Position, RobotId, RobotState, SnapshotPublisher, TeamSnapshot};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

const STEP_LENGTH_M: f32 = 0.05;
const MAX_TURN_RAD: f32 = 0.35;
const SUBSTITUTION_PROBABILITY: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Walker {
    id: RobotId,
    position: Vec2,
    heading: f32,
}

/// Deterministic random-walk team used when no robots are available.
///
/// Every step moves each robot a short distance, bouncing off the field
/// boundary, and occasionally substitutes the last robot off or back on.
#[derive(Debug)]
pub(crate) struct Simulation {
    rng: ChaCha8Rng,
    half_extents: Vec2,
    active: Vec<Walker>,
    bench: Option<Walker>,
}

impl Simulation {
    pub(crate) fn new(robots: usize, seed: u64, half_extents: Vec2) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let active = (0..robots)
            .map(|index| Walker {
                id: RobotId::new(index as u32),
                position: Vec2::new(
                    rng.gen_range(-half_extents.x..=half_extents.x),
                    rng.gen_range(-half_extents.y..=half_extents.y),
                ),
                heading: rng.gen_range(0.0..TAU),
            })
            .collect();

        Self {
            rng,
            half_extents,
            active,
            bench: None,
        }
    }

    pub(crate) fn step(&mut self) -> TeamSnapshot {
        if self.rng.gen_bool(SUBSTITUTION_PROBABILITY) {
            self.substitute();
        }

        for walker in &mut self.active {
            walker.heading += self.rng.gen_range(-MAX_TURN_RAD..=MAX_TURN_RAD);
            let mut next =
                walker.position + Vec2::from_angle(walker.heading) * STEP_LENGTH_M;
            if next.x.abs() > self.half_extents.x {
                walker.heading = std::f32::consts::PI - walker.heading;
                next.x = next.x.clamp(-self.half_extents.x, self.half_extents.x);
            }
            if next.y.abs() > self.half_extents.y {
                walker.heading = -walker.heading;
                next.y = next.y.clamp(-self.half_extents.y, self.half_extents.y);
            }
            walker.position = next;
        }

        TeamSnapshot::new(
            self.active
                .iter()
                .map(|walker| {
                    RobotState::new(
                        walker.id,
                        Position::new(walker.position.x, walker.position.y),
                    )
                })
                .collect(),
        )
    }

    fn substitute(&mut self) {
        match self.bench.take() {
            Some(walker) => self.active.push(walker),
            None if self.active.len() > 1 => self.bench = self.active.pop(),
            None => {}
        }
    }
}

/// Publishes a simulated snapshot every `interval` from a background thread.
pub(crate) fn spawn(
    mut simulation: Simulation,
    publisher: SnapshotPublisher<TeamSnapshot>,
    interval: Duration,
) -> Result<()> {
    info!(robots = simulation.active.len(), "starting simulated team");
    let _ = thread::Builder::new()
        .name("team-simulation".to_owned())
        .spawn(move || loop {
            publisher.publish(simulation.step());
            thread::sleep(interval);
        })
        .context("failed to start simulation thread")?;
    Ok(())
}
