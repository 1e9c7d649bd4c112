use std::{io, path::{Path, PathBuf}, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::externals::kernel_values::services::{DEFAULT_HUMIDITY_PATH, DEFAULT_TEMPERATURE_PATH};

/// Factory default address of an SHT3x with ADDR pulled low.
pub const DEFAULT_SHT3X_ADDRESS: u16 = 0x44;

/// Wait between triggering an SHT3x measurement and fetching it.
pub const DEFAULT_CONVERSION_DELAY_MS: u64 = 500;

/// Top level configuration, usually loaded from a TOML file. Every key is
/// optional and falls back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Kernel-exposed humidity value file.
    pub humidity_path: PathBuf,

    /// Kernel-exposed temperature value file.
    pub temperature_path: PathBuf,

    /// Bus device used when the request pin is 0.
    pub primary_i2c_bus: PathBuf,

    /// Bus device used for any other pin.
    pub secondary_i2c_bus: PathBuf,

    /// Milliseconds to wait for an SHT3x conversion.
    pub conversion_delay_ms: u64,

    /// Address used when a request selects SHT3x but carries none.
    pub default_sht3x_address: u16,
}

impl BackendConfig {
    pub fn conversion_delay(&self) -> Duration {
        Duration::from_millis(self.conversion_delay_ms)
    }

    /// Pick the bus device for a pin selector.
    pub fn i2c_bus_for_pin(&self, pin: i32) -> &Path {
        if pin == 0 {
            &self.primary_i2c_bus
        } else {
            &self.secondary_i2c_bus
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            humidity_path: PathBuf::from(DEFAULT_HUMIDITY_PATH),
            temperature_path: PathBuf::from(DEFAULT_TEMPERATURE_PATH),
            primary_i2c_bus: PathBuf::from("/dev/i2c-0"),
            secondary_i2c_bus: PathBuf::from("/dev/i2c-1"),
            conversion_delay_ms: DEFAULT_CONVERSION_DELAY_MS,
            default_sht3x_address: DEFAULT_SHT3X_ADDRESS,
        }
    }
}

/// What the daemon reads and how often.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    pub model: i32,
    pub pin: i32,
    pub i2c_address: Option<i32>,
    pub interval_ms: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            model: 22,
            pin: 4,
            i2c_address: None,
            interval_ms: 5000,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}'.")]
    FailedToRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file '{path}'.")]
    FailedToParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    /// Load from a TOML file, or use the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::FailedToRead {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::FailedToParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
