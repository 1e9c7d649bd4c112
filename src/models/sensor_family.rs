use derive_more::Display;

/// Highest model code handled by the DHT11/DHT22 branch.
pub const DHT_MAX_MODEL: i32 = 22;

/// Lowest model code handled by the SHT3x branch.
pub const SHT3X_MIN_MODEL: i32 = 30;

/// The sensor family a model code dispatches to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SensorFamily {
    /// Single-wire DHT11/DHT22 sensors on a GPIO line.
    #[display(fmt = "DHT11/DHT22")]
    Dht,

    /// SHT3x sensors on an I2C bus.
    #[display(fmt = "SHT3x")]
    Sht3x,
}

impl SensorFamily {
    /// Map a model code to a family. Codes in the gap between the two
    /// families have no branch and yield `None`.
    pub fn from_model(model: i32) -> Option<Self> {
        if model <= DHT_MAX_MODEL {
            Some(Self::Dht)
        } else if model >= SHT3X_MIN_MODEL {
            Some(Self::Sht3x)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_model() {
        assert_eq!(SensorFamily::from_model(11), Some(SensorFamily::Dht));
        assert_eq!(SensorFamily::from_model(22), Some(SensorFamily::Dht));
        assert_eq!(SensorFamily::from_model(-1), Some(SensorFamily::Dht));
        assert_eq!(SensorFamily::from_model(30), Some(SensorFamily::Sht3x));
        assert_eq!(SensorFamily::from_model(31), Some(SensorFamily::Sht3x));

        for model in 23..30 {
            assert_eq!(SensorFamily::from_model(model), None);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(SensorFamily::Dht.to_string(), "DHT11/DHT22");
        assert_eq!(SensorFamily::Sht3x.to_string(), "SHT3x");
    }
}
