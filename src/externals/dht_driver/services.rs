use derive_more::Display;
use thiserror::Error;

use crate::models::sensor_reading::SensorReading;

/// Status codes returned by the `pi_2_dht_read` driver.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DhtStatus {
    #[display(fmt = "success")]
    Success,
    #[display(fmt = "timeout waiting for the sensor")]
    Timeout,
    #[display(fmt = "checksum mismatch")]
    Checksum,
    #[display(fmt = "invalid argument")]
    Argument,
    #[display(fmt = "GPIO access failed")]
    Gpio,
    #[display(fmt = "unknown status {}", _0)]
    Unknown(i32),
}

impl From<i32> for DhtStatus {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Success,
            -1 => Self::Timeout,
            -2 => Self::Checksum,
            -3 => Self::Argument,
            -4 => Self::Gpio,
            other => Self::Unknown(other),
        }
    }
}

/// This service wraps the external bit-banging DHT driver. The read either
/// yields both values or fails as a whole.
pub trait DhtDriverService: Send + Sync {
    fn read(&self, model: i32, pin: i32) -> Result<SensorReading, DhtDriverError>;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DhtDriverError {
    /// The driver ran and reported a non-zero status.
    #[error("DHT driver failed: {0}.")]
    Failed(DhtStatus),

    /// This build was not linked against the driver library.
    #[error("DHT driver is not linked into this build.")]
    Unavailable,
}

/// Map a raw driver status and its output values into a result.
pub fn status_to_result(
    status: i32,
    humidity: f32,
    temperature: f32,
) -> Result<SensorReading, DhtDriverError> {
    match DhtStatus::from(status) {
        DhtStatus::Success => Ok(SensorReading {
            humidity,
            temperature,
        }),
        failure => Err(DhtDriverError::Failed(failure)),
    }
}

/// Stand-in used when the driver library is not linked. Every read fails,
/// so only the kernel value path can produce DHT readings.
pub struct UnlinkedDhtDriverService;

impl DhtDriverService for UnlinkedDhtDriverService {
    fn read(&self, _model: i32, _pin: i32) -> Result<SensorReading, DhtDriverError> {
        Err(DhtDriverError::Unavailable)
    }
}

#[cfg(feature = "pi-dht-driver")]
mod ffi {
    use std::os::raw::{c_float, c_int};

    #[link(name = "pi_2_dht_read")]
    extern "C" {
        pub fn pi_2_dht_read(
            sensor: c_int,
            pin: c_int,
            humidity: *mut c_float,
            temperature: *mut c_float,
        ) -> c_int;
    }
}

/// Calls `pi_2_dht_read` from the Raspberry Pi 2/3 DHT driver library.
#[cfg(feature = "pi-dht-driver")]
pub struct PiDhtDriverService;

#[cfg(feature = "pi-dht-driver")]
impl DhtDriverService for PiDhtDriverService {
    fn read(&self, model: i32, pin: i32) -> Result<SensorReading, DhtDriverError> {
        let mut humidity: f32 = 0.0;
        let mut temperature: f32 = 0.0;
        // SAFETY: both out pointers reference live locals for the whole call
        // and the driver writes at most one f32 through each.
        let status = unsafe { ffi::pi_2_dht_read(model, pin, &mut humidity, &mut temperature) };
        status_to_result(status, humidity, temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DhtStatus::from(0), DhtStatus::Success);
        assert_eq!(DhtStatus::from(-1), DhtStatus::Timeout);
        assert_eq!(DhtStatus::from(-2), DhtStatus::Checksum);
        assert_eq!(DhtStatus::from(-3), DhtStatus::Argument);
        assert_eq!(DhtStatus::from(-4), DhtStatus::Gpio);
        assert_eq!(DhtStatus::from(7), DhtStatus::Unknown(7));
    }

    #[test]
    fn test_status_to_result() {
        assert_eq!(
            status_to_result(0, 60.0, 23.5),
            Ok(SensorReading::new(60.0, 23.5))
        );
        assert_eq!(
            status_to_result(-2, 60.0, 23.5),
            Err(DhtDriverError::Failed(DhtStatus::Checksum))
        );
    }

    #[test]
    fn test_unlinked_driver_always_fails() {
        assert_eq!(
            UnlinkedDhtDriverService.read(22, 4),
            Err(DhtDriverError::Unavailable)
        );
    }
}
