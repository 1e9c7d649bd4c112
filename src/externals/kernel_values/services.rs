use std::{
    fs::File,
    io::{self, Read},
    num::ParseFloatError,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::trace;

use crate::models::sensor_reading::SensorReading;

pub const DEFAULT_HUMIDITY_PATH: &str =
    "/sys/bus/iio/devices/iio:device0/in_humidityrelative_input";
pub const DEFAULT_TEMPERATURE_PATH: &str = "/sys/bus/iio/devices/iio:device0/in_temp_input";

/// This service separates reading the values a kernel-resident DHT driver
/// exposes from the dispatch logic, which keeps the backend unit testable.
pub trait KernelValueService: Send + Sync {
    /// Read the latest humidity and temperature published by the kernel.
    /// Returns `Unavailable` when either value source cannot be opened,
    /// which is the signal to fall back to a bit-banged read.
    fn read_values(&self) -> Result<SensorReading, KernelValueServiceError>;
}

#[derive(Error, Debug)]
pub enum KernelValueServiceError {
    /// One of the value files could not be opened. No kernel driver is
    /// bound to the sensor.
    #[error("Kernel value file '{path}' is unavailable.")]
    Unavailable { path: PathBuf, source: io::Error },

    /// Both files opened but reading one of them failed.
    #[error("Failed to read kernel value file '{path}'.")]
    FailedToRead { path: PathBuf, source: io::Error },

    /// A value file did not hold a number.
    #[error("Failed to parse kernel value file '{path}'.")]
    FailedToParse {
        path: PathBuf,
        source: ParseFloatError,
    },
}

impl KernelValueServiceError {
    /// True when the kernel path is absent and a fallback is allowed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, KernelValueServiceError::Unavailable { .. })
    }
}

pub struct KernelValueServiceActual {
    humidity_path: PathBuf,
    temperature_path: PathBuf,
}

impl KernelValueServiceActual {
    pub fn new(humidity_path: impl Into<PathBuf>, temperature_path: impl Into<PathBuf>) -> Self {
        Self {
            humidity_path: humidity_path.into(),
            temperature_path: temperature_path.into(),
        }
    }
}

impl Default for KernelValueServiceActual {
    fn default() -> Self {
        Self::new(DEFAULT_HUMIDITY_PATH, DEFAULT_TEMPERATURE_PATH)
    }
}

fn open_value_file(path: &Path) -> Result<File, KernelValueServiceError> {
    File::open(path).map_err(|source| KernelValueServiceError::Unavailable {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_value_file(mut file: File, path: &Path) -> Result<f32, KernelValueServiceError> {
    let mut text = String::new();
    file.read_to_string(&mut text)
        .map_err(|source| KernelValueServiceError::FailedToRead {
            path: path.to_path_buf(),
            source,
        })?;
    trace!("Read '{}' from {}.", text.trim(), path.display());

    text.trim()
        .parse::<f32>()
        .map_err(|source| KernelValueServiceError::FailedToParse {
            path: path.to_path_buf(),
            source,
        })
}

impl KernelValueService for KernelValueServiceActual {
    /// Both files are opened before either is read, so a missing driver is
    /// detected without consuming a sample. Files are closed when dropped.
    fn read_values(&self) -> Result<SensorReading, KernelValueServiceError> {
        let humidity_file = open_value_file(&self.humidity_path)?;
        let temperature_file = open_value_file(&self.temperature_path)?;

        let humidity = parse_value_file(humidity_file, &self.humidity_path)?;
        let temperature = parse_value_file(temperature_file, &self.temperature_path)?;

        Ok(SensorReading {
            humidity,
            temperature,
        })
    }
}
