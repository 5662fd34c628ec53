//! Telemetry Error Types

use crate::Report;
use thiserror::Error;

/// Reasons a sample is rejected outright
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TelemetryError {
    /// Timestamp did not advance past the last accepted sample
    #[error("Out-of-order sample: {timestamp_ms}ms is not after {last_timestamp_ms}ms")]
    OutOfOrder {
        timestamp_ms: u64,
        last_timestamp_ms: u64,
    },

    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        timestamp_ms: u64,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Coordinates not on the globe
    #[error("Invalid position ({lat}, {lon})")]
    InvalidPosition { timestamp_ms: u64, lat: f64, lon: f64 },
}

impl TelemetryError {
    /// Diagnostic report for a rejected sample
    pub fn to_report(&self) -> Report {
        match self {
            TelemetryError::OutOfOrder { timestamp_ms, last_timestamp_ms } => {
                Report::OutOfOrderSample {
                    timestamp_ms: *timestamp_ms,
                    last_timestamp_ms: *last_timestamp_ms,
                }
            }
            TelemetryError::OutOfRange { timestamp_ms, .. }
            | TelemetryError::InvalidPosition { timestamp_ms, .. } => Report::InvalidSample {
                timestamp_ms: *timestamp_ms,
                reason: self.to_string(),
            },
        }
    }
}
