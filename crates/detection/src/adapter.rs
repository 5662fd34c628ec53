//! Detection to signal adaptation

use crate::{DetectionError, DetectionResult};
use telemetry::Signal;
use tracing::debug;

/// Forwards confident person detections as escalation signals
#[derive(Debug, Clone)]
pub struct DetectionAdapter {
    confidence_threshold: f64,
}

impl DetectionAdapter {
    pub fn new(confidence_threshold: f64) -> Self {
        Self { confidence_threshold }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// `Ok(None)` for frames below threshold or with nobody present
    pub fn adapt(&self, result: &DetectionResult) -> Result<Option<Signal>, DetectionError> {
        result.validate()?;

        if !result.person_present || result.confidence < self.confidence_threshold {
            debug!(
                "Detection at {}ms below threshold (present={}, confidence={:.2})",
                result.timestamp_ms, result.person_present, result.confidence
            );
            return Ok(None);
        }

        Ok(Some(Signal::PersonDetected {
            at_ms: result.timestamp_ms,
            confidence: result.confidence,
            boxes: result.bounding_boxes.len(),
        }))
    }
}
