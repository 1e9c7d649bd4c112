//! Asynchronous humidity/temperature reads for DHT11/DHT22 and SHT3x
//! sensors on a Raspberry Pi.
//!
//! Callers post an untyped request message carrying a reply port to the
//! [`SensorService`](internals::service::SensorService). A single worker
//! decodes it, performs the blocking hardware read off the caller's task and
//! posts exactly one reply: an 8-byte little-endian `[humidity, temperature]`
//! f32 payload, or the failure marker.

pub mod config;
pub mod externals;
pub mod internals;
pub mod models;

pub use internals::{
    core::{
        backend::PiSensorBackend,
        ports::{BackendError, SensorBackend},
    },
    service::{SensorService, ServiceError, ServicePort},
};
pub use models::{
    message::Value,
    reply::{Reply, ReplyPort},
    sensor_reading::SensorReading,
};
