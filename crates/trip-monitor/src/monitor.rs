//! Trip Monitor Implementation

use crate::EngineConfig;
use detection::{DetectionAdapter, DetectionResult};
use escalation::{Action, AlertLevel, AlertState, EscalationEngine, EscalationOutput, EscalationRecord};
use geofence::GeofenceIndex;
use route_context::ContextProvider;
use serde::Serialize;
use std::sync::Arc;
use stop_analyzer::{StopAnalyzer, StopEvent};
use telemetry::{Report, SampleCheck, SampleValidator, Signal, TelemetrySample};
use tracing::{debug, info};
use weight_analyzer::{StopContext, WeightAnalyzer, WeightDropEvent, WeightSummary};

/// Everything produced by one monitor call
#[derive(Debug, Clone, Default, Serialize)]
pub struct TripUpdate {
    /// Issued actions, in order
    pub actions: Vec<Action>,
    pub reports: Vec<Report>,
    /// Signals forwarded to escalation
    pub signals: Vec<Signal>,
    /// Stops finalized by this call
    pub stop_events: Vec<StopEvent>,
    pub weight_drops: Vec<WeightDropEvent>,
    /// Alert level after the call
    pub level: AlertLevel,
}

impl TripUpdate {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.reports.is_empty()
            && self.signals.is_empty()
            && self.stop_events.is_empty()
            && self.weight_drops.is_empty()
    }
}

/// Detection pipeline for a single trip
pub struct TripMonitor {
    trip_id: String,
    validator: SampleValidator,
    stops: StopAnalyzer,
    weight: WeightAnalyzer,
    adapter: DetectionAdapter,
    escalation: EscalationEngine,
    context: Option<Arc<dyn ContextProvider>>,
    samples_accepted: u64,
}

impl TripMonitor {
    pub fn new(trip_id: impl Into<String>, config: &EngineConfig, geofences: Arc<GeofenceIndex>) -> Self {
        let trip_id = trip_id.into();
        info!("Trip {}: monitor started with {} geofence(s)", trip_id, geofences.len());
        Self {
            validator: SampleValidator::new(config.validation_config()),
            stops: StopAnalyzer::new(trip_id.clone(), config.stop_config(), geofences),
            weight: WeightAnalyzer::new(trip_id.clone(), config.weight_config()),
            adapter: DetectionAdapter::new(config.detection_confidence_threshold),
            escalation: EscalationEngine::new(trip_id.clone(), config.escalation_config()),
            context: None,
            samples_accepted: 0,
            trip_id,
        }
    }

    /// Annotate actions with route context looked up at each sample
    pub fn with_context(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context = Some(provider);
        self
    }

    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    pub fn samples_accepted(&self) -> u64 {
        self.samples_accepted
    }

    /// Tag the trip's starting weight with a known packaging weight
    pub fn register_weight(&mut self, total_weight_kg: f64, packaging_weight_kg: f64, at_ms: u64) {
        self.weight.register_trip(total_weight_kg, packaging_weight_kg, at_ms);
    }

    pub fn ingest_sample(&mut self, sample: &TelemetrySample) -> TripUpdate {
        let mut update = TripUpdate::default();
        let t = sample.timestamp_ms;

        match self.validator.check(sample) {
            Err(e) => {
                update.reports.push(e.to_report());
                return self.finish_update(update);
            }
            Ok(SampleCheck::ImplausibleJump {
                distance_m,
                implied_speed_kmh,
            }) => {
                update.reports.push(Report::ImplausibleJump {
                    timestamp_ms: t,
                    distance_m,
                    implied_speed_kmh,
                });
                return self.finish_update(update);
            }
            Ok(SampleCheck::Accepted) => {}
        }
        self.samples_accepted += 1;

        if let Some(provider) = &self.context {
            self.escalation.set_context(Some(provider.context_at(sample.position, t)));
        }

        let due = self.escalation.advance_to(t);
        self.absorb(due, &mut update);

        let stop_out = self.stops.process(sample);
        let stop_context = match self.stops.active_stop() {
            Some(stop) => StopContext::Stopped {
                authorized: stop.inside_authorized_zone,
            },
            None => StopContext::Moving,
        };
        let settled = self.escalation.observe_stop(
            matches!(stop_context, StopContext::Stopped { authorized: false }),
            self.stops.is_resuming(),
        );
        self.absorb(settled, &mut update);
        let weight_out = self.weight.process(sample, stop_context);

        update.reports.extend(stop_out.reports);
        update.reports.extend(weight_out.report);
        update.stop_events.extend(stop_out.finalized);
        update.weight_drops.extend(weight_out.event);

        // Stop signals are ordered before the weight signal of the same sample
        for signal in stop_out.signals.into_iter().chain(weight_out.signal) {
            self.apply_signal(signal, &mut update);
        }

        self.finish_update(update)
    }

    pub fn ingest_detection(&mut self, result: &DetectionResult) -> TripUpdate {
        let mut update = TripUpdate::default();

        match self.adapter.adapt(result) {
            Err(e) => {
                update.reports.push(e.to_report(result.timestamp_ms));
            }
            Ok(Some(signal)) => self.apply_signal(signal, &mut update),
            Ok(None) => {
                let due = self.escalation.advance_to(result.timestamp_ms);
                self.absorb(due, &mut update);
            }
        }

        self.finish_update(update)
    }

    /// Operator resolution; clears the alert and releases weight locks
    pub fn resolve(&mut self, now_ms: u64) -> TripUpdate {
        let mut update = TripUpdate::default();
        let out = self.escalation.resolve(now_ms);
        self.absorb(out, &mut update);
        self.finish_update(update)
    }

    /// Fire timeouts due by `now_ms`
    pub fn advance_to(&mut self, now_ms: u64) -> TripUpdate {
        let mut update = TripUpdate::default();
        let out = self.escalation.advance_to(now_ms);
        self.absorb(out, &mut update);
        self.finish_update(update)
    }

    /// End of the sample stream; an ongoing stop is finalized as ongoing
    pub fn finish(&mut self) -> TripUpdate {
        let mut update = TripUpdate::default();
        update.stop_events.extend(self.stops.finish());
        info!(
            "Trip {}: stream finished after {} samples at {}",
            self.trip_id,
            self.samples_accepted,
            self.escalation.level()
        );
        self.finish_update(update)
    }

    pub fn alert_state(&self) -> AlertState {
        self.escalation.state()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.escalation.next_deadline()
    }

    pub fn clock_ms(&self) -> u64 {
        self.escalation.clock_ms()
    }

    pub fn active_stop(&self) -> Option<&StopEvent> {
        self.stops.active_stop()
    }

    pub fn weight_summary(&self) -> Option<WeightSummary> {
        self.weight.summary()
    }

    pub fn history(&self) -> &[EscalationRecord] {
        self.escalation.history()
    }

    fn apply_signal(&mut self, signal: Signal, update: &mut TripUpdate) {
        debug!("Trip {}: signal {}", self.trip_id, signal.kind().as_str());
        let out = self.escalation.handle_signal(&signal);
        update.signals.push(signal);
        self.absorb(out, update);
    }

    fn absorb(&mut self, out: EscalationOutput, update: &mut TripUpdate) {
        if out.release_locks {
            self.weight.clear_lock();
        }
        update.actions.extend(out.actions);
        update.reports.extend(out.reports);
    }

    fn finish_update(&self, mut update: TripUpdate) -> TripUpdate {
        update.level = self.escalation.level();
        update
    }
}
