use thiserror::Error;

use crate::{
    externals::{
        dht_driver::services::DhtDriverError, i2c::services::I2cServiceError,
        kernel_values::services::KernelValueServiceError,
    },
    models::sensor_reading::SensorReading,
};

/// Performs one blocking hardware read. Implementations must be callable
/// from a blocking worker thread, hence `Send + Sync + 'static`.
pub trait SensorBackend: Send + Sync + 'static {
    fn read(
        &self,
        model: i32,
        pin: i32,
        i2c_address: Option<i32>,
    ) -> Result<SensorReading, BackendError>;
}

/// Step of the SHT3x transaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum I2cStep {
    #[display(fmt = "open")]
    Open,
    #[display(fmt = "set slave address")]
    SetAddress,
    #[display(fmt = "trigger measurement")]
    Trigger,
    #[display(fmt = "select register")]
    SelectRegister,
    #[display(fmt = "read measurement")]
    Read,
}

/// Why a read produced no reading. Callers only ever see success or
/// failure; the detail is kept for logging.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Model {0} matches no sensor family.")]
    UnsupportedModel(i32),

    #[error("Kernel value read failed.")]
    KernelValues(#[from] KernelValueServiceError),

    #[error("Bit-banged DHT read failed.")]
    DhtDriver(#[from] DhtDriverError),

    #[error("I2C address {0} is out of range.")]
    InvalidAddress(i32),

    #[error("I2C {step} failed.")]
    I2c {
        step: I2cStep,
        source: I2cServiceError,
    },

    #[error("Short I2C write during {step}: {written} of {expected} bytes.")]
    ShortWrite {
        step: I2cStep,
        written: usize,
        expected: usize,
    },

    #[error("Short I2C read: {read} of {expected} bytes.")]
    ShortRead { read: usize, expected: usize },
}
