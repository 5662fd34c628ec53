//! Detection signals

use geofence::GeoPoint;
use serde::{Deserialize, Serialize};

/// Signal category, used for episode bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    SuspiciousStop,
    StopResolved,
    WeightDrop,
    PersonDetected,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::SuspiciousStop => "suspicious_stop",
            SignalKind::StopResolved => "stop_resolved",
            SignalKind::WeightDrop => "weight_drop",
            SignalKind::PersonDetected => "person_detected",
        }
    }

    /// Signals that corroborate theft on top of an unauthorized stop
    pub fn is_corroborating(&self) -> bool {
        matches!(self, SignalKind::WeightDrop | SignalKind::PersonDetected)
    }
}

/// Discrete detection event consumed by the escalation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// Stop outside every authorized zone lasted too long
    SuspiciousStop {
        at_ms: u64,
        location: GeoPoint,
        stopped_for_s: u64,
    },

    /// Truck resumed movement after a stop
    StopResolved {
        at_ms: u64,
        location: GeoPoint,
        duration_ms: u64,
        authorized: bool,
    },

    /// Cargo weight fell below the baseline during an unauthorized stop
    WeightDrop {
        at_ms: u64,
        drop_fraction: f64,
        current_weight_kg: f64,
    },

    /// Person detected near the cargo with enough confidence
    PersonDetected {
        at_ms: u64,
        confidence: f64,
        boxes: usize,
    },
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::SuspiciousStop { .. } => SignalKind::SuspiciousStop,
            Signal::StopResolved { .. } => SignalKind::StopResolved,
            Signal::WeightDrop { .. } => SignalKind::WeightDrop,
            Signal::PersonDetected { .. } => SignalKind::PersonDetected,
        }
    }

    pub fn at_ms(&self) -> u64 {
        match self {
            Signal::SuspiciousStop { at_ms, .. }
            | Signal::StopResolved { at_ms, .. }
            | Signal::WeightDrop { at_ms, .. }
            | Signal::PersonDetected { at_ms, .. } => *at_ms,
        }
    }

    /// Short human-readable reason, used on actions
    pub fn describe(&self) -> String {
        match self {
            Signal::SuspiciousStop { location, stopped_for_s, .. } => format!(
                "Unauthorized stop for {}s at ({:.5}, {:.5})",
                stopped_for_s, location.lat, location.lon
            ),
            Signal::StopResolved { duration_ms, authorized, .. } => format!(
                "Stop ended after {:.1}s ({})",
                *duration_ms as f64 / 1000.0,
                if *authorized { "authorized zone" } else { "outside authorized zones" }
            ),
            Signal::WeightDrop { drop_fraction, current_weight_kg, .. } => format!(
                "Cargo weight dropped {:.1}% to {:.1}kg",
                drop_fraction * 100.0,
                current_weight_kg
            ),
            Signal::PersonDetected { confidence, boxes, .. } => format!(
                "Person detected near cargo (confidence {:.2}, {} region(s))",
                confidence, boxes
            ),
        }
    }
}
