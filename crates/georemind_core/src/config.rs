//! Core runtime configuration.
//!
//! # Responsibility
//! - Resolve database location, logging settings and geofence radius.
//! - Accept overrides from environment variables or a JSON document.
//!
//! # Invariants
//! - A returned config has passed [`CoreConfig::validate`].

use crate::flow::geofence::DEFAULT_GEOFENCE_RADIUS_METERS;
use crate::flow::machine::FlowSettings;
use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "GEOREMIND_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "GEOREMIND_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "GEOREMIND_LOG_DIR";
pub const ENV_GEOFENCE_RADIUS: &str = "GEOREMIND_GEOFENCE_RADIUS_M";

const DEFAULT_DB_FILE_NAME: &str = "georemind.sqlite3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Rolling log directory; file logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub geofence_radius_meters: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            geofence_radius_meters: DEFAULT_GEOFENCE_RADIUS_METERS,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `GEOREMIND_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CoreConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(radius) = read(ENV_GEOFENCE_RADIUS) {
            config.geofence_radius_meters =
                radius.parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_GEOFENCE_RADIUS,
                    value: radius.clone(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document; missing keys keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::InvalidJson)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "db_path",
                value: String::new(),
            });
        }
        if normalize_level(&self.log_level).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "log_level",
                value: self.log_level.clone(),
            });
        }
        if !self.geofence_radius_meters.is_finite() || self.geofence_radius_meters <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "geofence_radius_meters",
                value: self.geofence_radius_meters.to_string(),
            });
        }
        Ok(())
    }

    /// Flow settings for the host's platform API level.
    pub fn flow_settings(&self, sdk_int: u32) -> FlowSettings {
        FlowSettings::for_platform(sdk_int).with_radius(self.geofence_radius_meters)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidJson(serde_json::Error),
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "invalid config document: {err}"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid config value for `{key}`: `{value}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}
