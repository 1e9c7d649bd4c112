use std::fmt::Display;

use super::reply::ReplyPort;

/// A validated read request. Owns the reply port, so it is consumed once.
#[derive(Debug)]
pub struct SensorRequest {
    /// Sensor type/revision code, e.g. 11 or 22 for DHT, 30+ for SHT3x.
    pub model: i32,

    /// GPIO line for DHT sensors, bus selector for SHT3x.
    pub pin: i32,

    /// Only present in the addressed request form.
    pub i2c_address: Option<i32>,

    pub reply: ReplyPort,
}

impl Display for SensorRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.i2c_address {
            Some(address) => write!(
                f,
                "(SensorRequest: model={}, pin={}, address={:#04x})",
                self.model, self.pin, address
            ),
            None => write!(
                f,
                "(SensorRequest: model={}, pin={})",
                self.model, self.pin
            ),
        }
    }
}
