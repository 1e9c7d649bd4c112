pub mod backend;
pub mod ports;
