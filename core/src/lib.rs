#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Botscope tools.
//!
//! This crate defines the data that flows between the robots, the diagnostics
//! shell and the trail visualiser. Telemetry arrives as [`RobotStatus`] and
//! [`TeamSnapshot`] values, manual commands leave as [`Primitive`] values, and
//! snapshots are handed across threads through a most-recent-wins
//! [`SnapshotBuffer`] that consumers poll without blocking.

mod buffer;

use std::{error::Error, fmt, net::Ipv6Addr, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

pub use buffer::{SnapshotBuffer, SnapshotPublisher, DEFAULT_SNAPSHOT_BUFFER_SIZE};

/// UDP port robots listen on for primitives.
pub const PRIMITIVE_PORT: u16 = 42070;

/// UDP port robot status reports are published on.
pub const ROBOT_STATUS_PORT: u16 = 42071;

/// UDP port world snapshots are published on for the trail viewer.
pub const WORLD_SNAPSHOT_PORT: u16 = 42077;

/// Host of the robot-side key-value store.
pub const KEY_VALUE_STORE_DEFAULT_HOST: &str = "127.0.0.1";

/// Port of the robot-side key-value store.
pub const KEY_VALUE_STORE_DEFAULT_PORT: u16 = 6379;

/// How long a robot may stay silent before it is reported as disconnected.
pub const DISCONNECT_DURATION: Duration = Duration::from_secs(1);

/// Number of battery cells in a single pack.
pub const NUM_CELLS_IN_BATTERY: u32 = 3;

/// Number of battery packs wired in series.
pub const NUM_BATTERIES_IN_SERIES: u32 = 2;

/// Lowest safe voltage of a single cell, including headroom.
pub const MIN_SINGLE_CELL_VOLTAGE: f32 = 3.5 + 0.1;

/// Highest voltage of a fully charged cell.
pub const MAX_SINGLE_CELL_VOLTAGE: f32 = 4.2;

/// Lowest safe battery voltage.
pub const MIN_BATTERY_VOLTAGE: f32 =
    MIN_SINGLE_CELL_VOLTAGE * (NUM_CELLS_IN_BATTERY * NUM_BATTERIES_IN_SERIES) as f32;

/// Voltage of a fully charged battery.
pub const MAX_BATTERY_VOLTAGE: f32 =
    MAX_SINGLE_CELL_VOLTAGE * (NUM_CELLS_IN_BATTERY * NUM_BATTERIES_IN_SERIES) as f32;

/// Voltage under which operators are warned to swap the battery.
pub const BATTERY_WARNING_VOLTAGE: f32 = MIN_BATTERY_VOLTAGE + 1.0;

/// Number of robot ids on one team.
pub const MAX_ROBOT_IDS_PER_SIDE: u32 = 8;

/// Number of robot ids across both teams, one multicast channel each.
pub const MAX_ROBOT_IDS: u32 = MAX_ROBOT_IDS_PER_SIDE * 2;

/// Link-local multicast groups assigned to robot channels, indexed by channel id.
const ROBOT_MULTICAST_CHANNELS: [Ipv6Addr; MAX_ROBOT_IDS as usize] = [
    channel_address(0x00),
    channel_address(0x01),
    channel_address(0x02),
    channel_address(0x03),
    channel_address(0x04),
    channel_address(0x05),
    channel_address(0x06),
    channel_address(0x07),
    channel_address(0x08),
    // Robots flashed with the older table listen on bb08 for channel 9 as well.
    channel_address(0x09),
    channel_address(0x10),
    channel_address(0x11),
    channel_address(0x12),
    channel_address(0x13),
    channel_address(0x14),
    channel_address(0x15),
];

const fn channel_address(suffix: u16) -> Ipv6Addr {
    Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0xc3d0, 0x42d2, 0xbb00 | suffix)
}

/// Resolves the multicast group for the provided channel.
///
/// Returns `None` when the channel lies outside the channel table.
#[must_use]
pub fn multicast_channel(channel: ChannelId) -> Option<Ipv6Addr> {
    ROBOT_MULTICAST_CHANNELS
        .get(channel.get() as usize)
        .copied()
}

/// Identifier of a robot multicast channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(u32);

impl ChannelId {
    /// Creates a new channel identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the channel.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RobotId(u32);

impl RobotId {
    /// Creates a new robot identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location on the field expressed in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    x: f32,
    y: f32,
}

impl Position {
    /// Creates a new position from world coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Coordinate along the field's length.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Coordinate along the field's width.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }
}

/// State of a single robot captured in a team snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    /// Identifier of the robot.
    pub id: RobotId,
    /// Global position of the robot when the snapshot was taken.
    pub position: Position,
}

impl RobotState {
    /// Creates a new robot state descriptor.
    #[must_use]
    pub const fn new(id: RobotId, position: Position) -> Self {
        Self { id, position }
    }
}

/// Periodic report of every robot on the friendly team.
///
/// Robots are listed in the order the publisher reported them; the count may
/// change between snapshots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    /// Robots reported by the snapshot.
    pub robots: Vec<RobotState>,
}

impl TeamSnapshot {
    /// Creates a snapshot from the provided robots.
    #[must_use]
    pub fn new(robots: Vec<RobotState>) -> Self {
        Self { robots }
    }

    /// Number of robots contained in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.robots.len()
    }

    /// Reports whether the snapshot lists no robots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }
}

/// Telemetry report emitted by a robot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotStatus {
    /// Identifier of the reporting robot.
    pub robot_id: RobotId,
    /// Monotonic sequence number assigned by the robot.
    pub sequence_number: u64,
    /// Robot clock at the time the status was sent, in seconds since the epoch.
    pub epoch_timestamp_seconds: u64,
    /// Measured battery voltage.
    pub battery_voltage: f32,
    /// Measured chipper/kicker capacitor voltage.
    pub capacitor_voltage: f32,
    /// Share of primitives the robot reports as lost, in percent.
    pub primitive_packet_loss_percentage: u32,
    /// Whether the robot is currently executing a primitive.
    pub running_primitive: bool,
}

/// Direction of travel accepted by the manual move command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveDirection {
    /// Straight ahead.
    Forward,
    /// Straight back.
    Back,
    /// Strafe to the left.
    Left,
    /// Strafe to the right.
    Right,
}

impl MoveDirection {
    /// All directions understood by the move command.
    pub const ALL: [MoveDirection; 4] = [Self::Forward, Self::Back, Self::Left, Self::Right];

    /// Heading the direction maps to, in degrees counter-clockwise from the robot's right.
    #[must_use]
    pub const fn heading_degrees(self) -> u16 {
        match self {
            Self::Forward => 90,
            Self::Back => 270,
            Self::Left => 180,
            Self::Right => 0,
        }
    }

    /// Lowercase name used by the shell.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MoveDirection {
    type Err = ParseDirectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|direction| direction.name() == normalised)
            .ok_or_else(|| ParseDirectionError(value.to_owned()))
    }
}

/// Error returned when a move direction cannot be recognised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDirectionError(String);

impl ParseDirectionError {
    /// Input that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a direction (expected forward, back, left or right)",
            self.0
        )
    }
}

impl Error for ParseDirectionError {}

/// Manual command sent to a robot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "primitive", rename_all = "snake_case")]
pub enum Primitive {
    /// Spin in place.
    Rotate {
        /// Angular velocity, positive counter-clockwise.
        velocity_rad_per_s: f32,
    },
    /// Translate along a fixed heading.
    Move {
        /// Direction requested by the operator.
        direction: MoveDirection,
        /// Heading derived from the direction.
        heading_degrees: u16,
        /// Speed as a percentage of the robot's maximum.
        speed: f32,
    },
    /// Chip the ball over a distance.
    Chip {
        /// Distance to the first bounce.
        distance_m: f32,
    },
    /// Kick the ball along the ground.
    Kick {
        /// Ball speed leaving the kicker.
        speed_m_per_s: f32,
    },
    /// Spin the dribbler.
    Dribble {
        /// Angular velocity of the dribbler roller.
        velocity_rad_per_s: f32,
    },
    /// Halt every actuator.
    Stop,
}

/// Non-blocking source of the most recently published value.
pub trait SnapshotSource<T> {
    /// Returns the newest value published since the last call, if any.
    ///
    /// Implementations must never block the caller.
    fn try_latest(&mut self) -> Option<T>;
}

/// A single pending value that is handed out once.
impl<T> SnapshotSource<T> for Option<T> {
    fn try_latest(&mut self) -> Option<T> {
        self.take()
    }
}
