//! Configuration for the Bulbkit host shell
//!
//! Provides configuration file handling and validation. Supports JSON and TOML
//! file formats, with the default file stored in the platform config directory.
//!
//! Configuration is organized into logical sections:
//! - Contract (the message contract version the host speaks)
//! - Participants (who may hold a bulb, how each is hosted, default targets)
//! - Bus (async channel capacity and message history)
//! - Logging (level and output format)

use bulbkit_core::{
    is_compatible_version, EventBus, EventBusConfig, ParticipantId, ParticipantRegistry,
    CONTRACT_VERSION,
};
use bulbkit_fragments::{FragmentKind, MountProps};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// Log levels accepted by `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Message contract settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSettings {
    /// Version stamped on every message the host emits
    pub version: String,
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            version: CONTRACT_VERSION.to_string(),
        }
    }
}

/// One participant of the bulb protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSettings {
    pub id: ParticipantId,
    /// Human-readable name shown in the console
    #[serde(default)]
    pub label: String,
    pub kind: FragmentKind,
    /// Targets preselected when the fragment mounts
    #[serde(default)]
    pub initial_targets: Vec<ParticipantId>,
}

impl ParticipantSettings {
    pub fn new(id: &str, label: &str, kind: FragmentKind, initial_targets: &[&str]) -> Self {
        Self {
            id: id.into(),
            label: label.to_string(),
            kind,
            initial_targets: initial_targets.iter().map(|t| ParticipantId::new(*t)).collect(),
        }
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSettings {
    /// Capacity of the async broadcast channel
    pub channel_capacity: usize,
    /// Keep published messages for later inspection
    pub enable_history: bool,
    pub max_history_size: usize,
    /// Seconds a message stays in history
    pub history_retention_secs: u64,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            enable_history: true,
            max_history_size: 200,
            history_retention_secs: 300,
        }
    }
}

impl BusSettings {
    pub fn to_bus_config(&self) -> EventBusConfig {
        EventBusConfig {
            channel_capacity: self.channel_capacity,
            enable_history: self.enable_history,
            max_history_size: self.max_history_size,
            history_retention: Duration::from_secs(self.history_retention_secs),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, colored output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level; `RUST_LOG` overrides it
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Complete host configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub contract: ContractSettings,
    #[serde(default = "default_participants")]
    pub participants: Vec<ParticipantSettings>,
    #[serde(default)]
    pub bus: BusSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

fn default_participants() -> Vec<ParticipantSettings> {
    let shared = ["host", "mfe1", "mfe2"];
    vec![
        ParticipantSettings::new("host", "Host", FragmentKind::Host, &shared),
        ParticipantSettings::new("mfe1", "Fragment 1", FragmentKind::DomMount, &shared),
        ParticipantSettings::new("mfe2", "Fragment 2", FragmentKind::DomMount, &shared),
        ParticipantSettings::new("mfe3", "Fragment 3", FragmentKind::CustomElement, &["mfe3"]),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contract: ContractSettings::default(),
            participants: default_participants(),
            bus: BusSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Default config file location: `<config dir>/bulbkit/config.toml`
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("bulbkit").join("config.toml"))
        .ok_or_else(|| {
            SettingsError::ConfigDirectory("no config directory on this platform".to_string())
        })
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into()),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !is_compatible_version(&self.contract.version) {
            return Err(ConfigError::ValueOutOfRange {
                key: "contract.version".to_string(),
                value: self.contract.version.clone(),
            });
        }

        // Participants
        if self.participants.is_empty() {
            return Err(ConfigError::NoParticipants);
        }
        let mut ids = HashSet::new();
        for participant in &self.participants {
            if participant.id.as_str().is_empty() {
                return Err(ConfigError::EmptyParticipantId);
            }
            if !ids.insert(participant.id.as_str()) {
                return Err(ConfigError::DuplicateParticipant(participant.id.to_string()));
            }
        }
        for participant in &self.participants {
            if let Some(target) = participant
                .initial_targets
                .iter()
                .find(|t| !ids.contains(t.as_str()))
            {
                return Err(ConfigError::UnknownParticipant {
                    target: target.to_string(),
                    referenced_by: participant.id.to_string(),
                });
            }
        }

        // Bus
        if self.bus.channel_capacity == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "bus.channel_capacity".to_string(),
                value: "0".to_string(),
            });
        }
        if self.bus.max_history_size == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "bus.max_history_size".to_string(),
                value: "0".to_string(),
            });
        }

        // Logging
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::UnknownLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&ParticipantSettings> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// Participant registry in configuration order
    pub fn registry(&self) -> SettingsResult<ParticipantRegistry> {
        let ids = self.participants.iter().map(|p| p.id.clone());
        Ok(ParticipantRegistry::new(ids)?)
    }

    /// Mount props for participant `id`, optionally wired to `bus`
    pub fn mount_props(&self, id: &ParticipantId, bus: Option<EventBus>) -> SettingsResult<MountProps> {
        let participant = self.participant(id).ok_or_else(|| ConfigError::UnknownParticipant {
            target: id.to_string(),
            referenced_by: "mount".to_string(),
        })?;

        let mut props = MountProps::new(participant.id.clone())
            .with_version(self.contract.version.clone())
            .with_initial_targets(participant.initial_targets.clone());
        if let Some(bus) = bus {
            props = props.with_bus(bus);
        }
        Ok(props)
    }
}
