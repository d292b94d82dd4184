use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use botscope_core::{
    ChannelId, DEFAULT_SNAPSHOT_BUFFER_SIZE, PRIMITIVE_PORT, ROBOT_STATUS_PORT,
    WORLD_SNAPSHOT_PORT,
};
use botscope_system_diagnostics::DEFAULT_REFRESH_INTERVAL;
use botscope_system_trails::DEFAULT_TRAIL_LENGTH;
use serde::Deserialize;
use tracing::info;

/// Settings loaded from `botscope.toml`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct BotscopeConfig {
    pub(crate) network: NetworkConfig,
    pub(crate) display: DisplayConfig,
    pub(crate) robot: RobotConfig,
    /// Values served to the `config` shell command, keyed without the leading `/`.
    pub(crate) store: toml::Table,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct NetworkConfig {
    pub(crate) interface: String,
    pub(crate) channel: u32,
    pub(crate) primitive_port: u16,
    pub(crate) status_port: u16,
    pub(crate) snapshot_port: u16,
    pub(crate) snapshot_buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_owned(),
            channel: 0,
            primitive_port: PRIMITIVE_PORT,
            status_port: ROBOT_STATUS_PORT,
            snapshot_port: WORLD_SNAPSHOT_PORT,
            snapshot_buffer_size: DEFAULT_SNAPSHOT_BUFFER_SIZE,
        }
    }
}

impl NetworkConfig {
    pub(crate) const fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.channel)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DisplayConfig {
    pub(crate) refresh_interval_ms: u64,
    pub(crate) trail_length: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL.as_millis() as u64,
            trail_length: DEFAULT_TRAIL_LENGTH,
        }
    }
}

impl DisplayConfig {
    pub(crate) fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RobotConfig {
    /// Shell command that restarts the robot's control loop service.
    pub(crate) restart_command: Option<String>,
}

impl BotscopeConfig {
    /// Reads the configuration at `path`, falling back to defaults when the file is absent.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no configuration file found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse configuration from {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = BotscopeConfig::parse("").expect("empty config is valid");

        assert_eq!(config, BotscopeConfig::default());
        assert_eq!(config.network.interface, "eth0");
        assert_eq!(config.network.primitive_port, 42070);
        assert_eq!(config.display.refresh_interval(), Duration::from_millis(250));
        assert_eq!(config.display.trail_length, 60);
        assert_eq!(config.robot.restart_command, None);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = BotscopeConfig::parse(
            r#"
            [network]
            interface = "wlan0"
            channel = 3

            [display]
            trail_length = 120

            [robot]
            restart_command = "systemctl restart thunderloop"

            [store]
            robot_id = 4
            network_interface = "wlan0"
            "#,
        )
        .expect("config is valid");

        assert_eq!(config.network.interface, "wlan0");
        assert_eq!(config.network.channel_id(), ChannelId::new(3));
        assert_eq!(config.network.status_port, 42071);
        assert_eq!(config.display.trail_length, 120);
        assert_eq!(config.display.refresh_interval_ms, 250);
        assert_eq!(
            config.robot.restart_command.as_deref(),
            Some("systemctl restart thunderloop")
        );
        assert_eq!(config.store.len(), 2);
    }

    #[test]
    fn zero_refresh_interval_is_promoted() {
        let config = BotscopeConfig::parse("[display]\nrefresh_interval_ms = 0")
            .expect("config is valid");

        assert_eq!(config.display.refresh_interval(), Duration::from_millis(1));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = BotscopeConfig::parse("[network]\nport = 1").expect_err("unknown field");

        assert!(error.to_string().contains("port"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("botscope-config-that-does-not-exist.toml");

        let config = BotscopeConfig::load(&path).expect("missing file falls back");

        assert_eq!(config, BotscopeConfig::default());
    }
}
