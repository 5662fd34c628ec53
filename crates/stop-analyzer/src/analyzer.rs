//! Stop Analyzer Implementation

use crate::{MotionState, StopConfig, StopEvent};
use geofence::{GeoPoint, GeofenceIndex};
use std::sync::Arc;
use telemetry::{Report, Signal, TelemetrySample};
use tracing::{debug, info, warn};

/// Everything the analyzer produced for one sample
#[derive(Debug, Clone, Default)]
pub struct StopOutput {
    pub signals: Vec<Signal>,
    pub reports: Vec<Report>,
    /// Stop finalized by this sample
    pub finalized: Option<StopEvent>,
}

struct ActiveStop {
    event: StopEvent,
    max_stop_ms: Option<u64>,
    suspicious_emitted: bool,
    overstay_reported: bool,
}

/// Stop analyzer for one trip
pub struct StopAnalyzer {
    trip_id: String,
    config: StopConfig,
    geofences: Arc<GeofenceIndex>,
    /// Start of the current run of slow samples while moving
    slow_since: Option<(u64, GeoPoint)>,
    /// Start of the current run of fast samples while stopped
    fast_since: Option<u64>,
    active: Option<ActiveStop>,
    last_sample_ms: Option<u64>,
    stops_finalized: usize,
}

impl StopAnalyzer {
    pub fn new(trip_id: impl Into<String>, config: StopConfig, geofences: Arc<GeofenceIndex>) -> Self {
        Self {
            trip_id: trip_id.into(),
            config,
            geofences,
            slow_since: None,
            fast_since: None,
            active: None,
            last_sample_ms: None,
            stops_finalized: 0,
        }
    }

    pub fn motion_state(&self) -> MotionState {
        if self.active.is_some() {
            MotionState::Stopped
        } else {
            MotionState::Moving
        }
    }

    /// The stop in progress, if any
    pub fn active_stop(&self) -> Option<&StopEvent> {
        self.active.as_ref().map(|a| &a.event)
    }

    /// Stopped, but fast samples are being debounced towards a resumption
    pub fn is_resuming(&self) -> bool {
        self.active.is_some() && self.fast_since.is_some()
    }

    pub fn stops_finalized(&self) -> usize {
        self.stops_finalized
    }

    /// Feed one accepted sample
    pub fn process(&mut self, sample: &TelemetrySample) -> StopOutput {
        let mut out = StopOutput::default();
        let t = sample.timestamp_ms;
        self.last_sample_ms = Some(t);
        let slow = sample.speed_kmh < self.config.stop_speed_threshold_kmh;

        if self.active.is_none() {
            if slow {
                let (since, location) = *self.slow_since.get_or_insert((t, sample.position));
                if t - since >= self.config.stop_confirm_ms() {
                    self.enter_stop(since, location, t, &mut out);
                }
            } else {
                self.slow_since = None;
            }
        } else if slow {
            self.fast_since = None;
        } else {
            let since = *self.fast_since.get_or_insert(t);
            if t - since >= self.config.resume_confirm_ms() {
                self.resume(since, t, &mut out);
                return out;
            }
        }

        self.check_duration(t, &mut out);
        out
    }

    /// Close the stream. An ongoing stop is finalized without an end time.
    pub fn finish(&mut self) -> Option<StopEvent> {
        self.slow_since = None;
        self.fast_since = None;
        let active = self.active.take()?;

        let mut event = active.event;
        let last = self.last_sample_ms.unwrap_or(event.start_ms);
        event.end_ms = None;
        event.ongoing = true;
        event.duration_ms = last.saturating_sub(event.start_ms);
        self.stops_finalized += 1;

        info!(
            "Trip {}: stream ended during stop at ({:.5}, {:.5}) after {:.1}s",
            self.trip_id,
            event.location.lat,
            event.location.lon,
            event.duration_seconds()
        );
        Some(event)
    }

    fn enter_stop(&mut self, since: u64, location: GeoPoint, now: u64, out: &mut StopOutput) {
        if self.geofences.is_empty() {
            warn!("Trip {}: no geofences configured, stop treated as unauthorized", self.trip_id);
            out.reports.push(Report::NoGeofencesConfigured { timestamp_ms: now });
        }

        // Classified once; drift during the stop is not re-queried
        let zone = self.geofences.authorized_zone_at(location);
        let event = StopEvent {
            trip_id: self.trip_id.clone(),
            start_ms: since,
            end_ms: None,
            location,
            duration_ms: now - since,
            inside_authorized_zone: zone.is_some(),
            zone_id: zone.map(|z| z.id.clone()),
            zone_label: zone.map(|z| z.label.clone()),
            ongoing: true,
        };

        match zone {
            Some(z) => info!("Trip {}: authorized stop confirmed at {}", self.trip_id, z.label),
            None => info!(
                "Trip {}: unauthorized stop confirmed at ({:.5}, {:.5})",
                self.trip_id, location.lat, location.lon
            ),
        }

        self.active = Some(ActiveStop {
            event,
            max_stop_ms: zone.and_then(|z| z.max_stop_minutes).map(|m| u64::from(m) * 60_000),
            suspicious_emitted: false,
            overstay_reported: false,
        });
        self.slow_since = None;
        self.fast_since = None;
    }

    fn resume(&mut self, end_ms: u64, now: u64, out: &mut StopOutput) {
        let Some(active) = self.active.take() else {
            return;
        };

        let mut event = active.event;
        event.end_ms = Some(end_ms);
        event.duration_ms = end_ms - event.start_ms;
        event.ongoing = false;
        self.fast_since = None;
        self.stops_finalized += 1;

        info!(
            "Trip {}: stop ended after {:.1}s ({})",
            self.trip_id,
            event.duration_seconds(),
            if event.inside_authorized_zone { "authorized" } else { "unauthorized" }
        );

        out.signals.push(Signal::StopResolved {
            at_ms: now,
            location: event.location,
            duration_ms: event.duration_ms,
            authorized: event.inside_authorized_zone,
        });
        out.finalized = Some(event);
    }

    fn check_duration(&mut self, now: u64, out: &mut StopOutput) {
        let suspicious_ms = self.config.suspicious_ms();
        // Pending resumption: the stop lasted until the truck started moving
        let until = self.fast_since.unwrap_or(now);
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let stopped_ms = until - active.event.start_ms;
        active.event.duration_ms = stopped_ms;

        if !active.event.inside_authorized_zone {
            if !active.suspicious_emitted && stopped_ms >= suspicious_ms {
                active.suspicious_emitted = true;
                warn!(
                    "Trip {}: unauthorized stop reached {}s",
                    self.trip_id,
                    stopped_ms / 1000
                );
                out.signals.push(Signal::SuspiciousStop {
                    at_ms: now,
                    location: active.event.location,
                    stopped_for_s: stopped_ms / 1000,
                });
            }
            return;
        }

        if let (Some(allowed), false) = (active.max_stop_ms, active.overstay_reported) {
            if stopped_ms > allowed {
                active.overstay_reported = true;
                let zone_id = active.event.zone_id.clone().unwrap_or_default();
                debug!("Trip {}: overstay in zone {}", self.trip_id, zone_id);
                out.reports.push(Report::ZoneOverstay {
                    timestamp_ms: now,
                    zone_id,
                    stopped_for_s: stopped_ms / 1000,
                    allowed_s: allowed / 1000,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofence::Geofence;
    use telemetry::SignalKind;

    const DEPOT: GeoPoint = GeoPoint { lat: 22.8046, lon: 86.2029 };
    const HIGHWAY: GeoPoint = GeoPoint { lat: 22.35, lon: 87.60 };

    fn config() -> StopConfig {
        StopConfig {
            stop_speed_threshold_kmh: 5.0,
            stop_confirm_s: 10,
            resume_confirm_s: 5,
            suspicious_stop_duration_s: 60,
        }
    }

    fn index() -> Arc<GeofenceIndex> {
        Arc::new(
            GeofenceIndex::new(vec![
                Geofence::circle("depot", "Depot", DEPOT, 1_000.0).with_max_stop_minutes(2)
            ])
            .unwrap(),
        )
    }

    fn sample(t_s: u64, at: GeoPoint, speed: f64) -> TelemetrySample {
        TelemetrySample::new(t_s * 1000, at, speed, 20_000.0)
    }

    /// Feed one sample per second over [from, to]
    fn run(analyzer: &mut StopAnalyzer, from: u64, to: u64, at: GeoPoint, speed: f64) -> Vec<StopOutput> {
        (from..=to).map(|t| analyzer.process(&sample(t, at, speed))).collect()
    }

    #[test]
    fn test_short_slowdown_is_not_a_stop() {
        let mut analyzer = StopAnalyzer::new("T1", config(), index());
        run(&mut analyzer, 0, 9, HIGHWAY, 0.0);
        assert_eq!(analyzer.motion_state(), MotionState::Moving);

        let outputs = run(&mut analyzer, 10, 20, HIGHWAY, 60.0);
        assert!(outputs.iter().all(|o| o.finalized.is_none() && o.signals.is_empty()));
        assert_eq!(analyzer.stops_finalized(), 0);
    }

    #[test]
    fn test_stop_confirmed_at_threshold() {
        let mut analyzer = StopAnalyzer::new("T1", config(), index());
        run(&mut analyzer, 0, 10, HIGHWAY, 0.0);
        assert_eq!(analyzer.motion_state(), MotionState::Stopped);

        let stop = analyzer.active_stop().unwrap();
        assert_eq!(stop.start_ms, 0);
        assert!(!stop.inside_authorized_zone);
    }

    #[test]
    fn test_suspicious_stop_emitted_once() {
        let mut analyzer = StopAnalyzer::new("T1", config(), index());
        let outputs = run(&mut analyzer, 0, 120, HIGHWAY, 0.0);

        let suspicious: Vec<_> = outputs
            .iter()
            .flat_map(|o| o.signals.iter())
            .filter(|s| s.kind() == SignalKind::SuspiciousStop)
            .collect();
        assert_eq!(suspicious.len(), 1);
        assert_eq!(suspicious[0].at_ms(), 60_000);
    }

    #[test]
    fn test_authorized_stop_is_never_suspicious() {
        let mut analyzer = StopAnalyzer::new("T1", config(), index());
        let outputs = run(&mut analyzer, 0, 300, DEPOT, 0.0);

        assert!(outputs
            .iter()
            .flat_map(|o| o.signals.iter())
            .all(|s| s.kind() != SignalKind::SuspiciousStop));

        // Two-minute allowance exceeded, reported once
        let overstays: Vec<_> = outputs
            .iter()
            .flat_map(|o| o.reports.iter())
            .filter(|r| matches!(r, Report::ZoneOverstay { .. }))
            .collect();
        assert_eq!(overstays.len(), 1);
    }

    #[test]
    fn test_classification_is_frozen() {
        let mut analyzer = StopAnalyzer::new("T1", config(), index());
        run(&mut analyzer, 0, 10, HIGHWAY, 0.0);
        // Slow drift into the depot does not reclassify the stop
        run(&mut analyzer, 11, 20, DEPOT, 1.0);
        assert!(!analyzer.active_stop().unwrap().inside_authorized_zone);
    }

    #[test]
    fn test_resume_finalizes_with_exact_duration() {
        let mut analyzer = StopAnalyzer::new("T1", config(), index());
        run(&mut analyzer, 0, 30, HIGHWAY, 0.0);
        let outputs = run(&mut analyzer, 31, 36, HIGHWAY, 50.0);

        let finalized: Vec<_> = outputs.iter().filter_map(|o| o.finalized.clone()).collect();
        assert_eq!(finalized.len(), 1);
        let stop = &finalized[0];
        assert_eq!(stop.end_ms, Some(31_000));
        assert_eq!(stop.duration_ms, 31_000);
        assert!(!stop.ongoing);

        let resolved = outputs.last().unwrap();
        assert!(matches!(
            resolved.signals.as_slice(),
            [Signal::StopResolved { at_ms: 36_000, duration_ms: 31_000, authorized: false, .. }]
        ));
        assert_eq!(analyzer.motion_state(), MotionState::Moving);
    }

    #[test]
    fn test_brief_movement_does_not_resume() {
        let mut analyzer = StopAnalyzer::new("T1", config(), index());
        run(&mut analyzer, 0, 30, HIGHWAY, 0.0);
        assert!(!analyzer.is_resuming());
        run(&mut analyzer, 31, 33, HIGHWAY, 20.0);
        assert!(analyzer.is_resuming());
        run(&mut analyzer, 34, 40, HIGHWAY, 0.0);
        assert!(!analyzer.is_resuming());
        assert_eq!(analyzer.motion_state(), MotionState::Stopped);
        assert_eq!(analyzer.active_stop().unwrap().duration_ms, 40_000);
    }

    #[test]
    fn test_finish_marks_stop_ongoing() {
        let mut analyzer = StopAnalyzer::new("T1", config(), index());
        run(&mut analyzer, 100, 145, HIGHWAY, 0.0);

        let stop = analyzer.finish().unwrap();
        assert!(stop.ongoing);
        assert_eq!(stop.end_ms, None);
        assert_eq!(stop.duration_ms, 45_000);
        assert!(analyzer.finish().is_none());
    }

    #[test]
    fn test_empty_geofences_reports_and_treats_stop_as_unauthorized() {
        let mut analyzer = StopAnalyzer::new("T1", config(), Arc::new(GeofenceIndex::empty()));
        let outputs = run(&mut analyzer, 0, 10, DEPOT, 0.0);

        assert!(outputs
            .last()
            .unwrap()
            .reports
            .contains(&Report::NoGeofencesConfigured { timestamp_ms: 10_000 }));
        assert!(!analyzer.active_stop().unwrap().inside_authorized_zone);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn count_stops(slow_span_s: u64, cfg: StopConfig) -> usize {
            let mut analyzer = StopAnalyzer::new("P", cfg, index());
            let mut stops = 0;
            run(&mut analyzer, 0, 5, HIGHWAY, 60.0);
            for t in 6..=6 + slow_span_s {
                analyzer.process(&sample(t, HIGHWAY, 0.0));
                if analyzer.motion_state() == MotionState::Stopped {
                    stops = 1;
                }
            }
            let resume_from = 7 + slow_span_s;
            for t in resume_from..resume_from + 30 {
                if analyzer.process(&sample(t, HIGHWAY, 60.0)).finalized.is_some() {
                    assert_eq!(stops, 1);
                }
            }
            stops + usize::from(analyzer.finish().is_some())
        }

        proptest! {
            #[test]
            fn confirmation_boundary(confirm in 1u64..120) {
                let cfg = StopConfig { stop_confirm_s: confirm, ..config() };
                prop_assert_eq!(count_stops(confirm - 1, cfg.clone()), 0);
                prop_assert_eq!(count_stops(confirm, cfg), 1);
            }

            #[test]
            fn finalized_duration_matches_bounds(
                start in 0u64..10_000,
                stopped in 10u64..2_000,
                resume_gap in 5u64..60,
            ) {
                let mut analyzer = StopAnalyzer::new("P", config(), index());
                let mut t = start;
                while t <= start + stopped {
                    analyzer.process(&sample(t, HIGHWAY, 0.0));
                    t += 1;
                }
                let mut finalized = None;
                for t in start + stopped + 1..=start + stopped + 1 + resume_gap {
                    if let Some(stop) = analyzer.process(&sample(t, HIGHWAY, 30.0)).finalized {
                        finalized = Some(stop);
                    }
                }
                let stop = finalized.expect("stop finalized after resume confirmation");
                let end = stop.end_ms.unwrap();
                prop_assert_eq!(stop.duration_ms, end - stop.start_ms);
                prop_assert_eq!(stop.start_ms, start * 1000);
            }
        }
    }
}
