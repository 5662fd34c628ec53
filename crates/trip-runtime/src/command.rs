//! Messages exchanged with a trip task

use detection::DetectionResult;
use escalation::{AlertState, EscalationRecord};
use serde::{Deserialize, Serialize};
use stop_analyzer::StopEvent;
use telemetry::TelemetrySample;
use tokio::sync::oneshot;
use trip_monitor::TripUpdate;
use weight_analyzer::WeightSummary;

/// Known cargo at trip start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CargoRegistration {
    pub total_weight_kg: f64,
    pub packaging_weight_kg: f64,
    #[serde(default)]
    pub at_ms: u64,
}

/// Point-in-time view of one trip
#[derive(Debug, Clone, Serialize)]
pub struct TripSnapshot {
    pub trip_id: String,
    pub alert: AlertState,
    pub clock_ms: u64,
    pub samples_accepted: u64,
    pub active_stop: Option<StopEvent>,
    pub weight: Option<WeightSummary>,
    pub history: Vec<EscalationRecord>,
}

pub(crate) enum Command {
    Sample(TelemetrySample),
    Detection(DetectionResult),
    /// Resolve at the given time, or at the trip clock
    Resolve(Option<u64>),
    Snapshot(oneshot::Sender<TripSnapshot>),
    Finish(oneshot::Sender<TripUpdate>),
}
