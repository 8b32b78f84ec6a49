// Library exports for integration tests and binaries

pub mod config;
pub mod countries;
pub mod geocoding;
pub mod greet;
pub mod server;
pub mod translation;
