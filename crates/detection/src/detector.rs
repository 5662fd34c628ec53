//! Person detector backends

use crate::{BoundingBox, DetectionError, DetectionResult};
use image::RgbImage;
use tracing::debug;

/// Narrow interface over a person-detection backend
pub trait PersonDetector: Send {
    type Frame;

    fn name(&self) -> &'static str;

    fn detect(&mut self, frame: &Self::Frame, timestamp_ms: u64) -> Result<DetectionResult, DetectionError>;
}

/// Pass-through for results computed upstream. Confidence is checked by
/// the adapter, which reports rejections.
#[derive(Debug, Default, Clone)]
pub struct PrecomputedDetector;

impl PersonDetector for PrecomputedDetector {
    type Frame = DetectionResult;

    fn name(&self) -> &'static str {
        "precomputed"
    }

    fn detect(&mut self, frame: &DetectionResult, _timestamp_ms: u64) -> Result<DetectionResult, DetectionError> {
        Ok(frame.clone())
    }
}

/// Decode an encoded camera frame (PNG, JPEG, ...) into RGB pixels
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, DetectionError> {
    if bytes.is_empty() {
        return Err(DetectionError::InvalidFrame("empty body".into()));
    }
    let image = image::load_from_memory(bytes).map_err(|e| DetectionError::InvalidFrame(e.to_string()))?;
    Ok(image.to_rgb8())
}

/// Colour-threshold heuristic for footage where people wear marked
/// red or blue vests. One blob per colour.
#[derive(Debug, Clone)]
pub struct ColorBlobDetector {
    /// Minimum matching pixels for a blob to count as a person
    pub pixel_threshold: usize,
}

impl Default for ColorBlobDetector {
    fn default() -> Self {
        Self { pixel_threshold: 500 }
    }
}

#[derive(Default)]
struct Blob {
    pixels: usize,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Blob {
    fn add(&mut self, x: u32, y: u32) {
        if self.pixels == 0 {
            (self.min_x, self.min_y, self.max_x, self.max_y) = (x, y, x, y);
        } else {
            self.min_x = self.min_x.min(x);
            self.min_y = self.min_y.min(y);
            self.max_x = self.max_x.max(x);
            self.max_y = self.max_y.max(y);
        }
        self.pixels += 1;
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            x: self.min_x,
            y: self.min_y,
            width: self.max_x - self.min_x + 1,
            height: self.max_y - self.min_y + 1,
        }
    }
}

fn is_red(r: u8, g: u8, b: u8) -> bool {
    r > 180 && g < 100 && b < 100
}

fn is_blue(r: u8, g: u8, b: u8) -> bool {
    r < 100 && g > 100 && b > 180
}

impl ColorBlobDetector {
    pub fn new(pixel_threshold: usize) -> Self {
        Self { pixel_threshold }
    }

    /// Confidence grows with blob size, from 0.5 at the threshold to 0.95
    fn confidence(&self, pixels: usize) -> f64 {
        let threshold = self.pixel_threshold.max(1) as f64;
        let excess = (pixels as f64 / threshold - 1.0).clamp(0.0, 3.0) / 3.0;
        0.5 + 0.45 * excess
    }
}

impl PersonDetector for ColorBlobDetector {
    type Frame = RgbImage;

    fn name(&self) -> &'static str {
        "color_blob"
    }

    fn detect(&mut self, frame: &RgbImage, timestamp_ms: u64) -> Result<DetectionResult, DetectionError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DetectionError::InvalidFrame("empty frame".into()));
        }

        let mut red = Blob::default();
        let mut blue = Blob::default();
        for (x, y, pixel) in frame.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            if is_red(r, g, b) {
                red.add(x, y);
            } else if is_blue(r, g, b) {
                blue.add(x, y);
            }
        }

        let people: Vec<&Blob> = [&red, &blue]
            .into_iter()
            .filter(|blob| blob.pixels > self.pixel_threshold)
            .collect();

        debug!(
            "Colour blobs at {}ms: red={} blue={} pixels, {} person(s)",
            timestamp_ms,
            red.pixels,
            blue.pixels,
            people.len()
        );

        if people.is_empty() {
            return Ok(DetectionResult::empty(timestamp_ms));
        }

        let confidence = people
            .iter()
            .map(|blob| self.confidence(blob.pixels))
            .fold(0.0, f64::max);

        Ok(DetectionResult {
            timestamp_ms,
            person_present: true,
            confidence,
            bounding_boxes: people.iter().map(|blob| blob.bounding_box()).collect(),
        })
    }
}
