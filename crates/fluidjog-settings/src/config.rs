//! Configuration file handling for fluidjog
//!
//! Supports JSON and TOML files. Every field has a default, so a file only
//! needs the values it changes. Configuration is organized into sections:
//! - Connection settings (port, baud rate, read timeout)
//! - Machine settings (feedrate limits, boot banner)
//! - Protocol timings
//! - Safety switches

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use fluidjog_core::{Axis, FeedrateLimits};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory under the platform config dir
pub const CONFIG_DIR_NAME: &str = "fluidjog";

/// File looked up inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port; the platform default is used when unset
    pub port: Option<String>,
    /// Baud rate for serial connections
    pub baud_rate: u32,
    /// Blocking read timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
            read_timeout_ms: 2000,
        }
    }
}

/// Machine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Maximum feedrate per axis letter, mm/min
    pub max_feedrate: BTreeMap<String, f64>,
    /// Substring identifying the controller boot banner
    pub boot_banner: String,
}

impl Default for MachineSettings {
    fn default() -> Self {
        let max_feedrate = Axis::ALL
            .iter()
            .map(|axis| (axis.to_string(), 2000.0))
            .collect();
        Self {
            max_feedrate,
            boot_banner: "FluidNC".to_string(),
        }
    }
}

/// Protocol timings, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub open_settle_ms: u64,
    pub boot_window_ms: u64,
    pub boot_poll_ms: u64,
    pub post_boot_settle_ms: u64,
    pub command_settle_ms: u64,
    pub status_poll_ms: u64,
    pub idle_timeout_ms: u64,
    pub loop_start_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            open_settle_ms: 500,
            boot_window_ms: 10_000,
            boot_poll_ms: 200,
            post_boot_settle_ms: 2000,
            command_settle_ms: 250,
            status_poll_ms: 250,
            idle_timeout_ms: 10_000,
            loop_start_delay_ms: 2000,
        }
    }
}

impl TimingSettings {
    fn fields(&self) -> [(&'static str, u64); 8] {
        [
            ("open_settle_ms", self.open_settle_ms),
            ("boot_window_ms", self.boot_window_ms),
            ("boot_poll_ms", self.boot_poll_ms),
            ("post_boot_settle_ms", self.post_boot_settle_ms),
            ("command_settle_ms", self.command_settle_ms),
            ("status_poll_ms", self.status_poll_ms),
            ("idle_timeout_ms", self.idle_timeout_ms),
            ("loop_start_delay_ms", self.loop_start_delay_ms),
        ]
    }
}

/// Safety switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    /// Abort the run when a jog never reports Idle
    pub stop_on_idle_timeout: bool,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Machine settings
    pub machine: MachineSettings,
    /// Protocol timings
    pub timing: TimingSettings,
    /// Safety switches
    pub safety: SafetySettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the per-user config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the per-user config file, or defaults when there is none
    pub fn load_default() -> SettingsResult<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| SettingsError::LoadError {
                path: path.display().to_string(),
                source,
            })?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                )
                .into())
            }
        };

        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.connection.baud_rate == 0 {
            return Err(out_of_range("connection.baud_rate", 0));
        }

        if self.connection.read_timeout_ms == 0 {
            return Err(out_of_range("connection.read_timeout_ms", 0));
        }

        if self.connection.port.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::MissingValue("connection.port".to_string()));
        }

        if self.machine.boot_banner.trim().is_empty() {
            return Err(ConfigError::MissingValue("machine.boot_banner".to_string()));
        }

        for (axis, max) in &self.machine.max_feedrate {
            if !max.is_finite() || *max <= 0.0 {
                return Err(out_of_range(&format!("machine.max_feedrate.{}", axis), max));
            }
        }

        if let Some((key, _)) = self.timing.fields().into_iter().find(|(_, ms)| *ms == 0) {
            return Err(out_of_range(&format!("timing.{}", key), 0));
        }

        Ok(())
    }

    /// Per-axis feedrate limits for jog command generation
    pub fn feedrate_limits(&self) -> SettingsResult<FeedrateLimits> {
        self.machine
            .max_feedrate
            .iter()
            .try_fold(FeedrateLimits::new(), |limits, (key, max)| {
                let axis: Axis = key.parse().map_err(|_| {
                    SettingsError::invalid(format!("machine.max_feedrate.{}", key), "unknown axis")
                })?;
                Ok(limits.with_axis(axis, *max))
            })
    }
}

fn out_of_range(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}
