//! Application configuration
//!
//! Options are kept as a flat TOML table and read through typed getters that
//! take a caller supplied default, so a missing or partial file never stops
//! the engine from starting.

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CONFIG_USE_DEFAULT_SENSITIVITY: &str = "use_default_sensitivity";
pub const CONFIG_TRIGGER_DEAD_ZONE_FRACTION: &str = "trigger_dead_zone_fraction";
pub const CONFIG_THUMBSTICK_DEAD_ZONE_FRACTION: &str = "thumbstick_dead_zone_fraction";
pub const CONFIG_INPUT_POLLING_INTERVAL_MS: &str = "input_polling_interval_ms";
pub const CONFIG_DEVICE_REFRESH_INTERVAL_MS: &str = "device_refresh_interval_ms";

pub const DEFAULT_USE_DEFAULT_SENSITIVITY: bool = true;
pub const DEFAULT_TRIGGER_DEAD_ZONE_FRACTION: f32 = 0.1;
pub const DEFAULT_STICK_DEAD_ZONE_FRACTION: f32 = 0.25;
/// Upper bound for user dead zones, a full dead zone would leave no travel
pub const MAX_DEAD_ZONE_FRACTION: f32 = 0.95;
pub const DEFAULT_INPUT_POLLING_INTERVAL_MS: i64 = 20;
pub const MIN_INPUT_POLLING_INTERVAL_MS: i64 = 10;
pub const DEFAULT_DEVICE_REFRESH_INTERVAL_MS: i64 = 2000;

const CONFIG_DIR: &str = "padsource";
const CONFIG_FILE: &str = "config.toml";

/// Read access to named options
pub trait ConfigSource {
    fn get_bool_val(&self, key: &str, default: bool) -> bool;
    fn get_float_val(&self, key: &str, default: f32) -> f32;
    fn get_int_val(&self, key: &str, default: i64) -> i64;
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct AppConfig {
    values: toml::Table,
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| eyre!("Failed to parse config: {}", e))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| eyre!("Failed to serialize config: {}", e))
    }

    /// Default location: `<config_dir>/padsource/config.toml`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Loads the config file, falling back to defaults when it is missing
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    debug!("Loaded config from {}: {:?}", path.display(), config);
                    config
                }
                Err(e) => {
                    warn!("Ignoring invalid config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Unable to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| eyre!("Failed to write config file: {}", e))
    }

    pub fn set_bool_val(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), toml::Value::Boolean(value));
    }

    pub fn set_float_val(&mut self, key: &str, value: f32) {
        self.values
            .insert(key.to_string(), toml::Value::Float(value as f64));
    }

    pub fn set_int_val(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), toml::Value::Integer(value));
    }

    /// Polling interval, clamped to the supported minimum
    pub fn input_polling_interval_ms(&self) -> u64 {
        self.get_int_val(
            CONFIG_INPUT_POLLING_INTERVAL_MS,
            DEFAULT_INPUT_POLLING_INTERVAL_MS,
        )
        .max(MIN_INPUT_POLLING_INTERVAL_MS) as u64
    }

    pub fn device_refresh_interval_ms(&self) -> u64 {
        self.get_int_val(
            CONFIG_DEVICE_REFRESH_INTERVAL_MS,
            DEFAULT_DEVICE_REFRESH_INTERVAL_MS,
        )
        .max(0) as u64
    }
}

impl ConfigSource for AppConfig {
    fn get_bool_val(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    fn get_float_val(&self, key: &str, default: f32) -> f32 {
        match self.values.get(key) {
            Some(toml::Value::Float(v)) => *v as f32,
            Some(toml::Value::Integer(v)) => *v as f32,
            _ => default,
        }
    }

    fn get_int_val(&self, key: &str, default: i64) -> i64 {
        self.values
            .get(key)
            .and_then(toml::Value::as_integer)
            .unwrap_or(default)
    }
}
