//! Stop events

use geofence::GeoPoint;
use serde::{Deserialize, Serialize};

/// A confirmed stop, ongoing or finalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopEvent {
    pub trip_id: String,

    /// Time of the first sample below the stop threshold (ms)
    pub start_ms: u64,

    /// Time of the first sample of the confirmed resumption (ms).
    /// `None` while ongoing or when the stream ended mid-stop.
    pub end_ms: Option<u64>,

    /// Where the truck stopped
    pub location: GeoPoint,

    /// Stop length so far (ms); `end_ms - start_ms` once finalized
    pub duration_ms: u64,

    /// Classification frozen at confirmation time
    pub inside_authorized_zone: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_label: Option<String>,

    /// Set when the stream ended before the truck moved again
    pub ongoing: bool,
}

impl StopEvent {
    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    pub fn is_suspicious(&self) -> bool {
        !self.inside_authorized_zone
    }
}
