pub mod core;
pub mod service;
