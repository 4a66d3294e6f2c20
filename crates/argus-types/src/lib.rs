//! Shared domain types for the Argus overlay pipeline.

pub mod config;
pub mod detection;
pub mod events;
pub mod frame;
pub mod geometry;
pub mod telemetry;

mod errors;

pub use errors::{ArgusError, Result};
