pub mod message;
pub mod reply;
pub mod sensor_family;
pub mod sensor_reading;
pub mod sensor_request;
