//! Error types for the settings crate.
//!
//! This module provides structured error types for loading, saving, and
//! validating configuration.

use bulbkit_core::RegistryError;
use thiserror::Error;

/// Errors that can occur during settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The configuration file could not be loaded.
    #[error("Failed to load settings: {0}")]
    LoadError(String),

    /// The configuration file could not be saved.
    #[error("Failed to save settings: {0}")]
    SaveError(String),

    /// The configuration directory could not be found or created.
    #[error("Config directory error: {0}")]
    ConfigDirectory(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// A configuration validation error occurred.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The participant list could not be turned into a registry.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors related to configuration validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file format is not supported.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A configuration value is out of valid range.
    #[error("Value out of range for '{key}': {value}")]
    ValueOutOfRange { key: String, value: String },

    /// No participants are configured.
    #[error("At least one participant must be configured")]
    NoParticipants,

    /// A participant has an empty id.
    #[error("Participant id must not be empty")]
    EmptyParticipantId,

    /// Two participants share an id.
    #[error("Duplicate participant id: {0}")]
    DuplicateParticipant(String),

    /// A participant or target names an id that is not configured.
    #[error("Unknown participant '{target}' referenced by {referenced_by}")]
    UnknownParticipant {
        target: String,
        referenced_by: String,
    },

    /// The log level is not one `tracing` understands.
    #[error("Unknown log level: {0}")]
    UnknownLogLevel(String),
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
