use std::{collections::BTreeMap, str::FromStr};

use thiserror::Error;

/// Keys the robot publishes in its key-value store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    /// Identifier of the robot.
    RobotId,
    /// Multicast channel the robot listens on.
    ChannelId,
    /// Network interface the robot communicates through.
    NetworkInterface,
    /// Kick calibration constant.
    KickConstant,
    /// Kick calibration exponential coefficient.
    KickCoefficient,
    /// Chipper solenoid pulse width.
    ChipPulseWidth,
    /// Measured current draw.
    CurrentDraw,
    /// Measured battery voltage.
    BatteryVoltage,
    /// Measured capacitor voltage.
    CapacitorVoltage,
}

impl StoreKey {
    /// Every key, in display order.
    pub const ALL: [StoreKey; 9] = [
        Self::RobotId,
        Self::ChannelId,
        Self::NetworkInterface,
        Self::KickConstant,
        Self::KickCoefficient,
        Self::ChipPulseWidth,
        Self::CurrentDraw,
        Self::BatteryVoltage,
        Self::CapacitorVoltage,
    ];

    /// Key under which the value is stored.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::RobotId => "/robot_id",
            Self::ChannelId => "/channel_id",
            Self::NetworkInterface => "/network_interface",
            Self::KickConstant => "/kick_constant",
            Self::KickCoefficient => "/kick_exp_coeff",
            Self::ChipPulseWidth => "/chip_pulse_width",
            Self::CurrentDraw => "/current_draw",
            Self::BatteryVoltage => "/battery_voltage",
            Self::CapacitorVoltage => "/cap_voltage",
        }
    }

    /// Human readable name of the value.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RobotId => "Robot ID",
            Self::ChannelId => "Channel ID",
            Self::NetworkInterface => "Network Interface",
            Self::KickConstant => "Kick Constant",
            Self::KickCoefficient => "Kick Coefficient",
            Self::ChipPulseWidth => "Chip Pulse Width",
            Self::CurrentDraw => "Current Draw",
            Self::BatteryVoltage => "Battery Voltage",
            Self::CapacitorVoltage => "Capacitor Voltage",
        }
    }
}

/// Errors raised while reading from a key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or read.
    #[error("key-value store is unavailable: {0}")]
    Unavailable(String),
    /// A stored value could not be interpreted.
    #[error("value '{value}' stored under '{key}' is invalid")]
    InvalidValue {
        /// Key holding the value.
        key: String,
        /// Raw stored value.
        value: String,
    },
}

/// Read access to the robot's key-value store.
pub trait KeyValueStore {
    /// Returns the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Reads `key` and parses it as `T`.
pub fn get_parsed<T, S>(store: &S, key: StoreKey) -> Result<Option<T>, StoreError>
where
    T: FromStr,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key.key())? else {
        return Ok(None);
    };

    let parsed = raw.trim().parse::<T>();
    match parsed {
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(StoreError::InvalidValue {
            key: key.key().to_owned(),
            value: raw,
        }),
    }
}

/// Store backed by an in-process map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into())
    }

    /// Builder-style variant of [`MemoryStore::insert`].
    #[must_use]
    pub fn with(mut self, key: StoreKey, value: impl Into<String>) -> Self {
        let _ = self.insert(key.key(), value);
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }
}
