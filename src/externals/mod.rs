pub mod dht_driver;
pub mod i2c;
pub mod kernel_values;
