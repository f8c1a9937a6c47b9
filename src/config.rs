//! Configuration System using Figment
//!
//! Configuration is loaded from:
//! 1. `config/slot_daq.toml` (base configuration)
//! 2. Environment variables prefixed with `SLOT_DAQ_`, nested keys split on `__`
//!
//! Every field has a default, so an empty or missing file yields a working
//! mock filter wheel.
//!
//! # Example
//! ```no_run
//! use slot_daq::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("Device: {}", config.device.name);
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use slot_core::{ConfigError, PositionRange};
use std::path::Path;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/slot_daq.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SLOT_DAQ_";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Slot device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Hardware driver selection
    #[serde(default)]
    pub driver: DriverDefinition,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Slot device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name published with every property
    #[serde(default = "default_device_name")]
    pub name: String,
    /// Client grouping for the properties
    #[serde(default = "default_group")]
    pub group: String,
    /// Lowest slot
    #[serde(default = "default_min")]
    pub min: i32,
    /// Highest slot
    #[serde(default = "default_max")]
    pub max: i32,
    /// Slot increment
    #[serde(default = "default_step")]
    pub step: i32,
    /// Publish per-slot names
    #[serde(default = "default_enable_labels")]
    pub enable_labels: bool,
    /// Names to publish instead of the ones the hardware reports
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Driver definition in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDefinition {
    /// Driver type (e.g. "mock_filter_wheel")
    #[serde(default = "default_driver_type")]
    pub r#type: String,
    /// Driver-specific configuration (dynamic)
    #[serde(default = "default_driver_config")]
    pub config: toml::Value,
}

// Default value functions
fn default_app_name() -> String {
    "slot-daq".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_device_name() -> String {
    "Filter Wheel".to_string()
}

fn default_group() -> String {
    "Main Control".to_string()
}

fn default_min() -> i32 {
    PositionRange::default().min
}

fn default_max() -> i32 {
    PositionRange::default().max
}

fn default_step() -> i32 {
    PositionRange::default().step
}

fn default_enable_labels() -> bool {
    true
}

fn default_driver_type() -> String {
    "mock_filter_wheel".to_string()
}

fn default_driver_config() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            group: default_group(),
            min: default_min(),
            max: default_max(),
            step: default_step(),
            enable_labels: default_enable_labels(),
            labels: Vec::new(),
        }
    }
}

impl Default for DriverDefinition {
    fn default() -> Self {
        Self {
            r#type: default_driver_type(),
            config: default_driver_config(),
        }
    }
}

impl DeviceConfig {
    /// Slot range described by `min`, `max` and `step`.
    pub fn range(&self) -> Result<PositionRange, ConfigError> {
        PositionRange::new(self.min, self.max, self.step)
    }
}

impl AppConfig {
    /// Load configuration from `config/slot_daq.toml` and environment variables
    ///
    /// Example: `SLOT_DAQ_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    /// Providers in merge order, exposed for callers that add their own.
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_format '{}' must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        if self.device.name.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceName);
        }

        let range = self.device.range()?;

        if self.device.labels.len() > range.label_count() {
            return Err(ConfigError::Invalid(format!(
                "{} labels configured for {} slots",
                self.device.labels.len(),
                range.label_count()
            )));
        }

        if !self.device.enable_labels && !self.device.labels.is_empty() {
            return Err(ConfigError::Invalid(
                "labels configured but enable_labels is false".to_string(),
            ));
        }

        if self.driver.r#type.trim().is_empty() {
            return Err(ConfigError::Invalid("driver type must not be empty".to_string()));
        }

        Ok(())
    }
}
