//! Person Detection
//!
//! Turns camera-derived detections into escalation signals:
//! - Detection results with confidence and bounding boxes
//! - Narrow detector interface so backends can be swapped
//! - Frame decoding and a colour-threshold detector for marked footage
//! - Confidence gating into `PersonDetected` signals
//!
//! No model inference runs here; results arrive precomputed or come from
//! the colour heuristic run over uploaded frames.

mod adapter;
mod detector;
mod result;

pub use adapter::DetectionAdapter;
pub use detector::{decode_frame, ColorBlobDetector, PersonDetector, PrecomputedDetector};
pub use result::{BoundingBox, DetectionResult};

use telemetry::Report;
use thiserror::Error;

/// Detection error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Confidence {confidence} at {timestamp_ms}ms is outside [0, 1]")]
    InvalidConfidence { timestamp_ms: u64, confidence: f64 },

    #[error("Frame rejected: {0}")]
    InvalidFrame(String),
}

impl DetectionError {
    /// Report surfaced to operators for a rejected detection
    pub fn to_report(&self, timestamp_ms: u64) -> Report {
        Report::DetectionRejected {
            timestamp_ms,
            reason: self.to_string(),
        }
    }
}
