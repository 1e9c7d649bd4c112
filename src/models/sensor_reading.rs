use std::fmt::Display;

/// A paired humidity/temperature sample. Both values always come from the
/// same read; there is no partially filled reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Relative humidity in percent.
    pub humidity: f32,

    /// Temperature in degrees Celsius.
    pub temperature: f32,
}

impl SensorReading {
    pub fn new(humidity: f32, temperature: f32) -> Self {
        Self {
            humidity,
            temperature,
        }
    }
}

impl Display for SensorReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(SensorReading: humidity={}%, temperature={} degC)",
            self.humidity, self.temperature
        )
    }
}
