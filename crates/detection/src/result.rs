//! Detection results

use crate::DetectionError;
use serde::{Deserialize, Serialize};

/// Pixel-space region around a detected person
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// One detector verdict for a camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub timestamp_ms: u64,
    pub person_present: bool,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub bounding_boxes: Vec<BoundingBox>,
}

impl DetectionResult {
    /// Frame with nobody in it
    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            person_present: false,
            confidence: 0.0,
            bounding_boxes: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectionError::InvalidConfidence {
                timestamp_ms: self.timestamp_ms,
                confidence: self.confidence,
            });
        }
        Ok(())
    }
}
