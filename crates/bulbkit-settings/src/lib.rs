//! Bulbkit Settings Crate
//!
//! Handles host configuration: participants, bus tuning, and logging.

pub mod config;
pub mod error;

pub use config::{
    default_config_path, BusSettings, Config, ContractSettings, LogFormat, LoggingSettings,
    ParticipantSettings, LOG_LEVELS,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
