//! Telemetry Vocabulary and Validation
//!
//! Shared types flowing through the detection pipeline:
//! - Telemetry samples from the truck (position, speed, weight)
//! - Signals consumed by the escalation state machine
//! - Non-fatal diagnostic reports
//! - Ordering, range, and position-jump validation of incoming samples

mod error;
mod report;
mod sample;
mod signal;
mod validator;

pub use error::TelemetryError;
pub use report::Report;
pub use sample::TelemetrySample;
pub use signal::{Signal, SignalKind};
pub use validator::{SampleCheck, SampleValidator, ValidationConfig};

pub use geofence::GeoPoint;
