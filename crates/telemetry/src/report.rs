//! Non-fatal diagnostic reports

use crate::SignalKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recoverable condition observed while processing a trip.
///
/// Reports never change alert state on their own; they are surfaced to
/// operators and logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    /// Sample timestamp did not advance; sample rejected
    OutOfOrderSample { timestamp_ms: u64, last_timestamp_ms: u64 },

    /// Sample values outside the plausible range; sample rejected
    InvalidSample { timestamp_ms: u64, reason: String },

    /// Position jump faster than a truck can move; sample excluded
    ImplausibleJump {
        timestamp_ms: u64,
        distance_m: f64,
        implied_speed_kmh: f64,
    },

    /// Not enough moving samples for a weight baseline yet
    BaselineNotReady {
        timestamp_ms: u64,
        samples_seen: usize,
        required: usize,
    },

    /// Stop classified with no zones loaded
    NoGeofencesConfigured { timestamp_ms: u64 },

    /// Authorized stop outlasted the zone's allowance
    ZoneOverstay {
        timestamp_ms: u64,
        zone_id: String,
        stopped_for_s: u64,
        allowed_s: u64,
    },

    /// Stop ended but corroborating signals keep the episode open
    PartiallyResolved {
        timestamp_ms: u64,
        open_signals: Vec<SignalKind>,
    },

    /// Resolve received with no open episode
    NothingToResolve { timestamp_ms: u64 },

    /// Command addressed to a trip that is not running
    UnknownTrip { trip_id: String },

    /// Detection result failed validation
    DetectionRejected { timestamp_ms: u64, reason: String },

    /// External dispatcher failed to deliver an issued action
    ActionDeliveryFailed {
        trip_id: String,
        action_id: String,
        error: String,
    },
}

impl Report {
    pub fn name(&self) -> &'static str {
        match self {
            Report::OutOfOrderSample { .. } => "out_of_order_sample",
            Report::InvalidSample { .. } => "invalid_sample",
            Report::ImplausibleJump { .. } => "implausible_jump",
            Report::BaselineNotReady { .. } => "baseline_not_ready",
            Report::NoGeofencesConfigured { .. } => "no_geofences_configured",
            Report::ZoneOverstay { .. } => "zone_overstay",
            Report::PartiallyResolved { .. } => "partially_resolved",
            Report::NothingToResolve { .. } => "nothing_to_resolve",
            Report::UnknownTrip { .. } => "unknown_trip",
            Report::DetectionRejected { .. } => "detection_rejected",
            Report::ActionDeliveryFailed { .. } => "action_delivery_failed",
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::OutOfOrderSample { timestamp_ms, last_timestamp_ms } => write!(
                f,
                "sample at {}ms rejected, last accepted at {}ms",
                timestamp_ms, last_timestamp_ms
            ),
            Report::InvalidSample { timestamp_ms, reason } => {
                write!(f, "sample at {}ms rejected: {}", timestamp_ms, reason)
            }
            Report::ImplausibleJump { timestamp_ms, distance_m, implied_speed_kmh } => write!(
                f,
                "sample at {}ms jumped {:.0}m ({:.0} km/h), excluded",
                timestamp_ms, distance_m, implied_speed_kmh
            ),
            Report::BaselineNotReady { samples_seen, required, .. } => write!(
                f,
                "weight baseline not ready ({}/{} samples)",
                samples_seen, required
            ),
            Report::NoGeofencesConfigured { .. } => {
                write!(f, "no geofences configured, stop treated as unauthorized")
            }
            Report::ZoneOverstay { zone_id, stopped_for_s, allowed_s, .. } => write!(
                f,
                "stop in zone {} lasted {}s, allowed {}s",
                zone_id, stopped_for_s, allowed_s
            ),
            Report::PartiallyResolved { open_signals, .. } => {
                let open: Vec<_> = open_signals.iter().map(|k| k.as_str()).collect();
                write!(f, "stop resolved, episode kept open by {}", open.join(", "))
            }
            Report::NothingToResolve { .. } => write!(f, "resolve ignored, no open episode"),
            Report::UnknownTrip { trip_id } => write!(f, "unknown trip {}", trip_id),
            Report::DetectionRejected { timestamp_ms, reason } => {
                write!(f, "detection at {}ms rejected: {}", timestamp_ms, reason)
            }
            Report::ActionDeliveryFailed { trip_id, action_id, error } => write!(
                f,
                "action {} for trip {} not delivered: {}",
                action_id, trip_id, error
            ),
        }
    }
}
