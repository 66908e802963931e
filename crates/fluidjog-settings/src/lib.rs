//! fluidjog Settings Crate
//!
//! Loads the optional configuration file: serial defaults, per-axis feedrate
//! limits, protocol timings and safety switches. Settings are read once at
//! startup and never written back.

pub mod config;
pub mod error;

pub use config::{
    Config, ConnectionSettings, MachineSettings, SafetySettings, TimingSettings,
    CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
