//! flow-live — Live pose comparison.
//!
//! Periodically samples a [`flow_core::KeypointSource`], scores each pose
//! against the current reference and publishes the result on a watch channel.

pub mod config;
pub mod engine;

pub use config::{ConfigError, LiveConfig};
pub use engine::{LiveComparison, LiveUpdate, ReferenceError};
