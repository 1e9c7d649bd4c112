use tracing::{debug, trace, warn};

use crate::{
    config::BackendConfig,
    externals::{
        dht_driver::services::DhtDriverService,
        i2c::services::{I2cBusService, I2cDevice},
        kernel_values::services::KernelValueService,
    },
    models::{sensor_family::SensorFamily, sensor_reading::SensorReading},
};

use super::ports::{BackendError, I2cStep, SensorBackend};

/// Single-shot, high repeatability, clock stretching enabled.
pub const SHT3X_MEASURE_COMMAND: [u8; 2] = [0x2C, 0x06];

/// Register select written before fetching the measurement.
pub const SHT3X_READ_COMMAND: [u8; 1] = [0x00];

/// Temperature MSB, LSB, CRC, humidity MSB, LSB, CRC.
pub const SHT3X_MEASUREMENT_LEN: usize = 6;

/// `T = -45 + 175 * raw / 65535`
pub fn sht3x_temperature(msb: u8, lsb: u8) -> f32 {
    let raw = f64::from(msb) * 256.0 + f64::from(lsb);
    ((raw * 175.0) / 65535.0 - 45.0) as f32
}

/// `RH = 100 * raw / 65535`
pub fn sht3x_humidity(msb: u8, lsb: u8) -> f32 {
    let raw = f64::from(msb) * 256.0 + f64::from(lsb);
    ((raw * 100.0) / 65535.0) as f32
}

/// Decode a measurement frame. The CRC bytes are not checked.
pub fn decode_sht3x_measurement(frame: &[u8; SHT3X_MEASUREMENT_LEN]) -> SensorReading {
    SensorReading {
        temperature: sht3x_temperature(frame[0], frame[1]),
        humidity: sht3x_humidity(frame[3], frame[4]),
    }
}

/// The Raspberry Pi backend. Dispatches on the model code:
/// DHT models try the kernel driver's value files first and fall back to
/// the bit-banged driver, SHT3x models run an I2C transaction.
pub struct PiSensorBackend<K, D, B> {
    kernel_values: K,
    dht_driver: D,
    i2c_bus: B,
    config: BackendConfig,
}

impl<K, D, B> PiSensorBackend<K, D, B>
where
    K: KernelValueService,
    D: DhtDriverService,
    B: I2cBusService,
{
    pub fn new(kernel_values: K, dht_driver: D, i2c_bus: B, config: BackendConfig) -> Self {
        Self {
            kernel_values,
            dht_driver,
            i2c_bus,
            config,
        }
    }

    #[tracing::instrument(skip(self))]
    fn read_dht(&self, model: i32, pin: i32) -> Result<SensorReading, BackendError> {
        match self.kernel_values.read_values() {
            Ok(reading) => {
                debug!("Read kernel values: {}", reading);
                return Ok(reading);
            }
            Err(e) if e.is_unavailable() => {
                trace!("Kernel values unavailable, falling back to driver. Error: {}", e);
            }
            Err(e) => return Err(e.into()),
        }

        let reading = self.dht_driver.read(model, pin)?;
        debug!("Read from DHT driver: {}", reading);
        Ok(reading)
    }

    #[tracing::instrument(skip(self))]
    fn read_sht3x(
        &self,
        pin: i32,
        i2c_address: Option<i32>,
    ) -> Result<SensorReading, BackendError> {
        let address = match i2c_address {
            Some(raw) => u16::try_from(raw).map_err(|_| BackendError::InvalidAddress(raw))?,
            None => self.config.default_sht3x_address,
        };

        let path = self.config.i2c_bus_for_pin(pin);
        // The device handle is dropped, and so closed, on every return below.
        let mut device = self.i2c_bus.open(path).map_err(|source| BackendError::I2c {
            step: I2cStep::Open,
            source,
        })?;

        device
            .set_slave_address(address)
            .map_err(|source| BackendError::I2c {
                step: I2cStep::SetAddress,
                source,
            })?;

        write_all(&mut device, &SHT3X_MEASURE_COMMAND, I2cStep::Trigger)?;
        std::thread::sleep(self.config.conversion_delay());
        write_all(&mut device, &SHT3X_READ_COMMAND, I2cStep::SelectRegister)?;

        let mut frame = [0u8; SHT3X_MEASUREMENT_LEN];
        let read = device.read(&mut frame).map_err(|source| BackendError::I2c {
            step: I2cStep::Read,
            source,
        })?;
        if read != SHT3X_MEASUREMENT_LEN {
            return Err(BackendError::ShortRead {
                read,
                expected: SHT3X_MEASUREMENT_LEN,
            });
        }
        trace!("Measurement frame: {:02x?}", frame);

        let reading = decode_sht3x_measurement(&frame);
        debug!("Read SHT3x at {:#04x} on {}: {}", address, path.display(), reading);
        Ok(reading)
    }
}

fn write_all(device: &mut impl I2cDevice, bytes: &[u8], step: I2cStep) -> Result<(), BackendError> {
    let written = device
        .write(bytes)
        .map_err(|source| BackendError::I2c { step, source })?;
    if written != bytes.len() {
        return Err(BackendError::ShortWrite {
            step,
            written,
            expected: bytes.len(),
        });
    }
    Ok(())
}

impl<K, D, B> SensorBackend for PiSensorBackend<K, D, B>
where
    K: KernelValueService + 'static,
    D: DhtDriverService + 'static,
    B: I2cBusService + 'static,
{
    fn read(
        &self,
        model: i32,
        pin: i32,
        i2c_address: Option<i32>,
    ) -> Result<SensorReading, BackendError> {
        match SensorFamily::from_model(model) {
            Some(SensorFamily::Dht) => self.read_dht(model, pin),
            Some(SensorFamily::Sht3x) => self.read_sht3x(pin, i2c_address),
            None => {
                warn!("No sensor family for model {}.", model);
                Err(BackendError::UnsupportedModel(model))
            }
        }
    }
}
