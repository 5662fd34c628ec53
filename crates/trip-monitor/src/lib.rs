//! Trip Monitor
//!
//! Correlates every analyzer for one trip:
//! - Sample validation (ordering, ranges, position jumps)
//! - Stop detection against authorized zones
//! - Weight loss during unauthorized stops
//! - Person detections from the cargo camera
//!
//! Resulting signals drive the trip's escalation engine. Processing is
//! synchronous and deterministic; time only moves with sample timestamps
//! and explicit `advance_to` calls.

mod config;
mod monitor;

pub use config::EngineConfig;
pub use monitor::{TripMonitor, TripUpdate};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be {expected}, got {value}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}
