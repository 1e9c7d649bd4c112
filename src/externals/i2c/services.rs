use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    os::fd::AsRawFd,
    path::Path,
};

use thiserror::Error;
use tracing::trace;

/// `I2C_SLAVE` request from `linux/i2c-dev.h`.
const I2C_SLAVE: u16 = 0x0703;

nix::ioctl_write_int_bad!(set_i2c_slave_address, I2C_SLAVE);

/// Opens I2C bus devices. Kept behind a trait so the transaction logic can
/// be exercised without hardware.
pub trait I2cBusService: Send + Sync {
    type Device: I2cDevice;

    fn open(&self, path: &Path) -> Result<Self::Device, I2cServiceError>;
}

/// An open bus device. The underlying handle is released when the value is
/// dropped.
pub trait I2cDevice {
    /// Select the target of subsequent reads and writes.
    fn set_slave_address(&mut self, address: u16) -> Result<(), I2cServiceError>;

    /// Write raw bytes, returning how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, I2cServiceError>;

    /// Read raw bytes, returning how many were filled.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, I2cServiceError>;
}

#[derive(Error, Debug)]
pub enum I2cServiceError {
    #[error("Failed to open I2C device.")]
    FailedToOpen(#[source] io::Error),

    #[error("Failed to set I2C slave address {0:#04x}.")]
    FailedToSetAddress(u16, #[source] nix::Error),

    #[error("Failed to write to I2C device.")]
    FailedToWrite(#[source] io::Error),

    #[error("Failed to read from I2C device.")]
    FailedToRead(#[source] io::Error),
}

/// Character-device access to `/dev/i2c-N`.
pub struct LinuxI2cBusService;

pub struct LinuxI2cDevice {
    file: File,
}

impl I2cBusService for LinuxI2cBusService {
    type Device = LinuxI2cDevice;

    fn open(&self, path: &Path) -> Result<Self::Device, I2cServiceError> {
        trace!("Opening {}.", path.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(I2cServiceError::FailedToOpen)?;
        Ok(LinuxI2cDevice { file })
    }
}

impl I2cDevice for LinuxI2cDevice {
    fn set_slave_address(&mut self, address: u16) -> Result<(), I2cServiceError> {
        // SAFETY: the descriptor belongs to `self.file` and stays open for
        // the duration of the call. I2C_SLAVE takes the address by value.
        unsafe { set_i2c_slave_address(self.file.as_raw_fd(), address.into()) }
            .map(drop)
            .map_err(|e| I2cServiceError::FailedToSetAddress(address, e))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, I2cServiceError> {
        self.file.write(bytes).map_err(I2cServiceError::FailedToWrite)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, I2cServiceError> {
        self.file.read(buffer).map_err(I2cServiceError::FailedToRead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = LinuxI2cBusService.open(&dir.path().join("i2c-9"));

        assert!(matches!(result, Err(I2cServiceError::FailedToOpen(_))));
    }

    #[test]
    fn test_slave_address_rejected_on_regular_file() {
        let file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let mut device = LinuxI2cBusService
            .open(file.path())
            .expect("Failed to open temp file");

        let result = device.set_slave_address(0x44);
        assert!(matches!(
            result,
            Err(I2cServiceError::FailedToSetAddress(0x44, _))
        ));
    }
}
