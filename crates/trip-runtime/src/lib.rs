//! Trip Runtime
//!
//! Runs every trip as its own tokio task:
//! - commands reach a trip through a single-consumer queue
//! - escalation timeouts are slept on and re-armed after every command
//! - issued actions go to an `ActionSink` without waiting on delivery
//! - all outputs are recorded in the shared `EventLog`

mod command;
mod supervisor;
mod task;

pub use command::{CargoRegistration, TripSnapshot};
pub use supervisor::{RuntimeConfig, TripSupervisor};

use detection::DetectionError;
use thiserror::Error;
use trip_monitor::ConfigError;

/// Runtime errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Unknown trip: {0}")]
    UnknownTrip(String),

    #[error("Trip already running: {0}")]
    TripAlreadyRunning(String),

    #[error("Trip {0} stopped before replying")]
    TripStopped(String),

    #[error("Invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Frame rejected: {0}")]
    Frame(#[from] DetectionError),

    #[error("Frame detector failed: {0}")]
    Detector(String),
}
