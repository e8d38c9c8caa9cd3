//! Domain layer: models, ports, and error types.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{Result, StoreError};
