//! Weight Analyzer Implementation

use crate::profile::{WeightProfile, WeightSummary, DEFAULT_PACKAGING_KG};
use crate::{StopContext, WeightBaseline, WeightConfig};
use serde::{Deserialize, Serialize};
use telemetry::{GeoPoint, Report, Signal, TelemetrySample};
use tracing::{debug, info, warn};

/// Weight loss observed during an unauthorized stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDropEvent {
    pub trip_id: String,
    pub time_ms: u64,
    pub baseline_weight_kg: f64,
    pub current_weight_kg: f64,
    pub drop_fraction: f64,
    pub drop_kg: f64,
    pub location: GeoPoint,
}

/// Everything the analyzer produced for one sample
#[derive(Debug, Clone, Default)]
pub struct WeightOutput {
    pub signal: Option<Signal>,
    pub event: Option<WeightDropEvent>,
    pub report: Option<Report>,
}

/// Weight analyzer for one trip
pub struct WeightAnalyzer {
    trip_id: String,
    config: WeightConfig,
    baseline: WeightBaseline,
    /// Baseline frozen while a drop is open
    locked: bool,
    in_stop: bool,
    stop_authorized: bool,
    last_emitted_fraction: Option<f64>,
    not_ready_reported: bool,
    profile: Option<WeightProfile>,
    current_weight_kg: Option<f64>,
    drops_detected: usize,
}

impl WeightAnalyzer {
    pub fn new(trip_id: impl Into<String>, config: WeightConfig) -> Self {
        let baseline = WeightBaseline::new(config.baseline_window);
        Self {
            trip_id: trip_id.into(),
            config,
            baseline,
            locked: false,
            in_stop: false,
            stop_authorized: false,
            last_emitted_fraction: None,
            not_ready_reported: false,
            profile: None,
            current_weight_kg: None,
            drops_detected: 0,
        }
    }

    /// Tag the trip's starting weight. Overrides auto-registration.
    pub fn register_trip(&mut self, total_weight_kg: f64, packaging_weight_kg: f64, at_ms: u64) {
        info!(
            "Trip {}: registered weight {:.1}kg (packaging {:.1}kg)",
            self.trip_id, total_weight_kg, packaging_weight_kg
        );
        self.profile = Some(WeightProfile {
            total_weight_kg,
            packaging_weight_kg,
            registered_at_ms: at_ms,
        });
    }

    pub fn profile(&self) -> Option<&WeightProfile> {
        self.profile.as_ref()
    }

    pub fn baseline(&self) -> &WeightBaseline {
        &self.baseline
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn drops_detected(&self) -> usize {
        self.drops_detected
    }

    /// Feed one accepted sample together with the stop state it belongs to
    pub fn process(&mut self, sample: &TelemetrySample, stop: StopContext) -> WeightOutput {
        let mut out = WeightOutput::default();
        if self.profile.is_none() {
            self.register_trip(sample.weight_kg, DEFAULT_PACKAGING_KG, sample.timestamp_ms);
        }
        self.current_weight_kg = Some(sample.weight_kg);

        match stop {
            StopContext::Moving => {
                if self.in_stop {
                    self.end_stop();
                }
                if self.locked {
                    return out;
                }
                if sample.speed_kmh < self.config.min_baseline_speed_kmh {
                    debug!(
                        "Trip {}: {:.1}km/h sample kept out of the weight baseline",
                        self.trip_id, sample.speed_kmh
                    );
                } else {
                    self.baseline.push(sample.weight_kg);
                }
            }
            StopContext::Stopped { authorized: true } => {
                self.in_stop = true;
                self.stop_authorized = true;
            }
            StopContext::Stopped { authorized: false } => {
                self.in_stop = true;
                self.evaluate(sample, &mut out);
            }
        }
        out
    }

    /// Release the frozen baseline and start collecting a fresh one
    pub fn clear_lock(&mut self) {
        if self.locked {
            info!("Trip {}: weight baseline lock cleared", self.trip_id);
        }
        self.locked = false;
        self.last_emitted_fraction = None;
        self.baseline.clear();
    }

    pub fn summary(&self) -> Option<WeightSummary> {
        let profile = self.profile.as_ref()?;
        let current = self.current_weight_kg.unwrap_or(profile.total_weight_kg);
        Some(WeightSummary::compute(profile, current, self.drops_detected))
    }

    fn end_stop(&mut self) {
        self.in_stop = false;
        self.last_emitted_fraction = None;
        self.not_ready_reported = false;
        if self.stop_authorized {
            // Deliveries change the load legitimately
            debug!("Trip {}: weight baseline restarted after authorized stop", self.trip_id);
            self.stop_authorized = false;
            if !self.locked {
                self.baseline.clear();
            }
        }
    }

    fn evaluate(&mut self, sample: &TelemetrySample, out: &mut WeightOutput) {
        let t = sample.timestamp_ms;
        let baseline = match self.baseline.mean() {
            Some(b) if self.baseline.is_ready() && b > 0.0 => b,
            _ => {
                if !self.not_ready_reported {
                    self.not_ready_reported = true;
                    warn!(
                        "Trip {}: weight baseline not ready ({}/{})",
                        self.trip_id,
                        self.baseline.len(),
                        self.baseline.capacity()
                    );
                    out.report = Some(Report::BaselineNotReady {
                        timestamp_ms: t,
                        samples_seen: self.baseline.len(),
                        required: self.baseline.capacity(),
                    });
                }
                return;
            }
        };

        let drop_fraction = (baseline - sample.weight_kg) / baseline;
        if drop_fraction < self.config.drop_threshold {
            return;
        }

        if let Some(previous) = self.last_emitted_fraction {
            if drop_fraction < previous + self.config.rearm_delta {
                debug!(
                    "Trip {}: weight drop {:.3} already raised at {:.3}",
                    self.trip_id, drop_fraction, previous
                );
                return;
            }
        }

        self.last_emitted_fraction = Some(drop_fraction);
        self.locked = true;
        self.drops_detected += 1;

        let event = WeightDropEvent {
            trip_id: self.trip_id.clone(),
            time_ms: t,
            baseline_weight_kg: baseline,
            current_weight_kg: sample.weight_kg,
            drop_fraction,
            drop_kg: baseline - sample.weight_kg,
            location: sample.position,
        };

        warn!(
            "Trip {}: weight dropped {:.1}% ({:.1}kg) during unauthorized stop",
            self.trip_id,
            drop_fraction * 100.0,
            event.drop_kg
        );

        out.signal = Some(Signal::WeightDrop {
            at_ms: t,
            drop_fraction,
            current_weight_kg: sample.weight_kg,
        });
        out.event = Some(event);
    }
}
