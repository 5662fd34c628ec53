//! Telemetry sample

use geofence::GeoPoint;
use serde::{Deserialize, Serialize};

/// One telemetry reading from the truck
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Source clock timestamp (milliseconds)
    pub timestamp_ms: u64,

    /// GPS position
    pub position: GeoPoint,

    /// Ground speed (km/h)
    pub speed_kmh: f64,

    /// Load cell reading (kg)
    pub weight_kg: f64,
}

impl TelemetrySample {
    pub fn new(timestamp_ms: u64, position: GeoPoint, speed_kmh: f64, weight_kg: f64) -> Self {
        Self {
            timestamp_ms,
            position,
            speed_kmh,
            weight_kg,
        }
    }
}
