#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure diagnostics system behind the interactive robot shell.
//!
//! Shell lines are parsed into [`ShellCommand`] values, which [`Diagnostics`]
//! validates and clamps to the robot's safe operating limits before turning
//! them into [`Primitive`] values for the transport to send. Telemetry flows
//! the other way through a [`StatusBoard`] and is rendered into tables that
//! are refreshed through a cancellable [`LiveFrames`] stream.

mod command;
mod live;
mod status;
mod store;
mod table;

use botscope_core::{MoveDirection, ParseDirectionError, Primitive};
use thiserror::Error;
use tracing::debug;

pub use command::{parse_line, ParsedLine, ShellCommand};
pub use live::{CancelToken, LiveFrames, DEFAULT_REFRESH_INTERVAL};
pub use status::{
    PacketLossTracker, SequenceOutcome, StatusBoard, StatusEntry, RECENT_LOSS_PERIOD,
};
pub use store::{get_parsed, KeyValueStore, MemoryStore, StoreError, StoreKey};
pub use table::{config_table, stats_table, Table};

/// Safe operating limits applied to manual commands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    /// Largest rotation speed in either direction, in rad/s.
    pub max_rotation_rad_per_s: f32,
    /// Largest move speed, as a percentage of the robot's maximum.
    pub max_move_speed: f32,
    /// Longest chip distance, in metres.
    pub max_chip_distance_m: f32,
    /// Fastest kick speed, in m/s.
    pub max_kick_speed_m_per_s: f32,
    /// Fastest dribbler speed, in rad/s.
    pub max_dribbler_rad_per_s: f32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rotation_rad_per_s: 4.0,
            max_move_speed: 100.0,
            max_chip_distance_m: 2.0,
            max_kick_speed_m_per_s: 6.0,
            max_dribbler_rad_per_s: 5.0,
        }
    }
}

/// Action the shell should take for a command.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Send the primitive to the robot and show the message.
    Send {
        /// Primitive to transmit.
        primitive: Primitive,
        /// Confirmation shown to the operator.
        message: String,
    },
    /// Display live statistics.
    ShowStats {
        /// Optional number of frames to show before returning.
        frames: Option<usize>,
    },
    /// Display the key-value store contents.
    ShowConfig {
        /// Optional number of frames to show before returning.
        frames: Option<usize>,
    },
    /// Restart the robot's control loop service.
    Restart,
    /// Leave the shell.
    Quit,
}

/// Errors raised while interpreting shell commands.
#[derive(Debug, Error, PartialEq)]
pub enum DiagnosticsError {
    /// The move direction was not recognised.
    #[error("invalid command: {0}")]
    InvalidDirection(#[from] ParseDirectionError),
    /// A numeric argument was NaN or infinite.
    #[error("{argument} must be a finite number")]
    NonFinite {
        /// Name of the offending argument.
        argument: &'static str,
    },
}

/// Translates shell commands into primitives within safe limits.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Diagnostics {
    limits: Limits,
}

impl Diagnostics {
    /// Creates a diagnostics system that enforces `limits`.
    #[must_use]
    pub const fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Determines the action required by `command`.
    pub fn handle(&self, command: &ShellCommand) -> Result<Outcome, DiagnosticsError> {
        let limits = self.limits;
        let outcome = match *command {
            ShellCommand::Rotate { velocity } => {
                let max = limits.max_rotation_rad_per_s;
                let velocity = clamp("velocity", velocity, -max, max)?;
                send(
                    Primitive::Rotate {
                        velocity_rad_per_s: velocity,
                    },
                    format!("Rotating at {velocity} rad/s"),
                )
            }
            ShellCommand::Move {
                ref direction,
                speed,
            } => {
                let direction: MoveDirection = direction.parse()?;
                let speed = clamp("speed", speed, 0.0, limits.max_move_speed)?;
                let heading_degrees = direction.heading_degrees();
                send(
                    Primitive::Move {
                        direction,
                        heading_degrees,
                        speed,
                    },
                    format!(
                        "Going {direction} and mapping to {heading_degrees} at the current speed {speed}"
                    ),
                )
            }
            ShellCommand::Chip { distance } => {
                let distance = clamp("distance", distance, 0.0, limits.max_chip_distance_m)?;
                send(
                    Primitive::Chip {
                        distance_m: distance,
                    },
                    format!("Chipping {distance} meters"),
                )
            }
            ShellCommand::Kick { speed } => {
                let speed = clamp("speed", speed, 0.0, limits.max_kick_speed_m_per_s)?;
                send(
                    Primitive::Kick {
                        speed_m_per_s: speed,
                    },
                    format!("Kicking at {speed} meters per second"),
                )
            }
            ShellCommand::Dribble { velocity } => {
                let velocity = clamp("velocity", velocity, 0.0, limits.max_dribbler_rad_per_s)?;
                send(
                    Primitive::Dribble {
                        velocity_rad_per_s: velocity,
                    },
                    format!("Spinning dribbler at {velocity} rad per second"),
                )
            }
            ShellCommand::Stop => send(Primitive::Stop, "Stopping robot".to_owned()),
            ShellCommand::Stats { frames } => Outcome::ShowStats { frames },
            ShellCommand::Config { frames } => Outcome::ShowConfig { frames },
            ShellCommand::Restart => Outcome::Restart,
            ShellCommand::Quit => Outcome::Quit,
        };
        Ok(outcome)
    }
}

fn send(primitive: Primitive, message: String) -> Outcome {
    Outcome::Send { primitive, message }
}

fn clamp(argument: &'static str, value: f32, min: f32, max: f32) -> Result<f32, DiagnosticsError> {
    if !value.is_finite() {
        return Err(DiagnosticsError::NonFinite { argument });
    }

    let clamped = value.clamp(min, max);
    if clamped != value {
        debug!(argument, requested = value, clamped, "clamped command argument");
    }
    Ok(clamped)
}
