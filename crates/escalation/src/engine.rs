//! Escalation Engine Implementation

use crate::transition::{transition, EpisodeView, Input, Step};
use crate::{Action, ActionKind, AlertLevel, EscalationConfig};
use route_context::RouteContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use telemetry::{Report, Signal, SignalKind};
use tracing::{debug, info, warn};

/// Deferred level change, cancelled by any transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTimeout {
    pub level: AlertLevel,
    pub due_ms: u64,
    pub generation: u64,
}

/// What moved the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum TransitionCause {
    Signal { signal: SignalKind },
    Timeout,
    Resolve,
}

/// One level change in a trip's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub time_ms: u64,
    pub episode: u64,
    pub from: AlertLevel,
    pub to: AlertLevel,
    #[serde(flatten)]
    pub cause: TransitionCause,
    pub action_id: Option<String>,
}

/// Snapshot of a trip's alert state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub trip_id: String,
    pub level: AlertLevel,
    pub entered_at_ms: u64,
    pub contributing_signals: BTreeSet<SignalKind>,
    /// Episodes opened so far; the current one while active
    pub episode: u64,
    /// Stop ended while corroboration kept the episode open
    pub partially_resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_timeout_ms: Option<u64>,
}

/// Everything one engine call produced
#[derive(Debug, Clone, Default)]
pub struct EscalationOutput {
    /// In issue order
    pub actions: Vec<Action>,
    pub reports: Vec<Report>,
    /// Weight baseline locks should be cleared
    pub release_locks: bool,
}

impl EscalationOutput {
    fn merge(&mut self, other: EscalationOutput) {
        self.actions.extend(other.actions);
        self.reports.extend(other.reports);
        self.release_locks |= other.release_locks;
    }
}

/// Escalation state machine for one trip
pub struct EscalationEngine {
    trip_id: String,
    config: EscalationConfig,
    level: AlertLevel,
    entered_at_ms: u64,
    clock_ms: u64,
    episode: u64,
    contributing: BTreeSet<SignalKind>,
    /// Corroborations seen during an unauthorized stop before the episode
    /// opened; at most one per kind
    deferred: Vec<Signal>,
    stop_ongoing: bool,
    unauthorized_stop: bool,
    /// Truck moving again, resumption not yet confirmed
    resuming: bool,
    /// L1 timeout came due while the stop was not persisting
    l1_held: bool,
    partially_resolved: bool,
    pending: Option<PendingTimeout>,
    generation: u64,
    action_seq: u64,
    context: Option<RouteContext>,
    history: Vec<EscalationRecord>,
}

impl EscalationEngine {
    pub fn new(trip_id: impl Into<String>, config: EscalationConfig) -> Self {
        Self {
            trip_id: trip_id.into(),
            config,
            level: AlertLevel::None,
            entered_at_ms: 0,
            clock_ms: 0,
            episode: 0,
            contributing: BTreeSet::new(),
            deferred: Vec::new(),
            stop_ongoing: false,
            unauthorized_stop: false,
            resuming: false,
            l1_held: false,
            partially_resolved: false,
            pending: None,
            generation: 0,
            action_seq: 0,
            context: None,
            history: Vec::new(),
        }
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn pending_timeout(&self) -> Option<PendingTimeout> {
        self.pending
    }

    /// Due time of the next scheduled transition
    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.map(|p| p.due_ms)
    }

    pub fn history(&self) -> &[EscalationRecord] {
        &self.history
    }

    /// Corroborations waiting for an episode to open
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Stop state after each accepted sample.
    ///
    /// Corroboration at None is only held while a confirmed unauthorized stop
    /// is in progress; leaving it drops anything held. While `resuming` the
    /// stop does not persist, so an L1 timeout due then is held, and fires as
    /// soon as the truck settles back into the same stop.
    pub fn observe_stop(&mut self, unauthorized_stop: bool, resuming: bool) -> EscalationOutput {
        let mut out = EscalationOutput::default();
        if self.unauthorized_stop && !unauthorized_stop && !self.deferred.is_empty() {
            debug!(
                "Trip {}: unauthorized stop over, {} held signal(s) dropped",
                self.trip_id,
                self.deferred.len()
            );
            self.deferred.clear();
        }
        let settled = self.resuming && !resuming;
        self.unauthorized_stop = unauthorized_stop;
        self.resuming = resuming;

        if settled
            && self.l1_held
            && self.unauthorized_stop
            && self.stop_ongoing
            && self.level == AlertLevel::Watchlist
        {
            info!("Trip {}: stop persists after held L1 timeout", self.trip_id);
            self.enter(
                AlertLevel::Warning,
                TransitionCause::Timeout,
                "Stop persisted past the L1 timeout".into(),
                &mut out,
            );
        }
        out
    }

    /// Annotation attached to subsequently issued actions
    pub fn set_context(&mut self, context: Option<RouteContext>) {
        self.context = context;
    }

    pub fn state(&self) -> AlertState {
        AlertState {
            trip_id: self.trip_id.clone(),
            level: self.level,
            entered_at_ms: self.entered_at_ms,
            contributing_signals: self.contributing.clone(),
            episode: self.episode,
            partially_resolved: self.partially_resolved,
            next_timeout_ms: self.next_deadline(),
        }
    }

    /// Apply a signal. Timeouts due at or before the signal fire first.
    pub fn handle_signal(&mut self, signal: &Signal) -> EscalationOutput {
        let mut out = self.advance_to(signal.at_ms());
        out.merge(self.apply_signal(signal));
        out
    }

    /// Operator resolution of the current episode
    pub fn resolve(&mut self, now_ms: u64) -> EscalationOutput {
        let mut out = self.advance_to(now_ms);
        match transition(self.level, &Input::Resolve, &self.view()) {
            Step::Clear => {
                info!("Trip {}: episode {} resolved by operator", self.trip_id, self.episode);
                self.clear(TransitionCause::Resolve, "Resolved by operator".into(), &mut out);
                out.release_locks = true;
            }
            Step::NothingToResolve => {
                warn!("Trip {}: resolve with no open episode", self.trip_id);
                out.reports.push(Report::NothingToResolve {
                    timestamp_ms: self.clock_ms,
                });
            }
            step => unreachable!("resolve produced {:?}", step),
        }
        out
    }

    /// Move the logical clock forward, firing every timeout due by `now_ms`
    pub fn advance_to(&mut self, now_ms: u64) -> EscalationOutput {
        let mut out = EscalationOutput::default();

        while let Some(pending) = self.pending {
            if pending.due_ms > now_ms {
                break;
            }
            self.pending = None;
            self.clock_ms = self.clock_ms.max(pending.due_ms);

            match transition(self.level, &Input::Timeout(pending.level), &self.view()) {
                Step::Advance(to) => {
                    let waited_s = pending.due_ms.saturating_sub(self.entered_at_ms) / 1000;
                    let reason = format!("No resolution after {}s at {}", waited_s, self.level);
                    self.enter(to, TransitionCause::Timeout, reason, &mut out);
                }
                Step::Hold => {
                    debug!("Trip {}: {} timeout held, stop not persisting", self.trip_id, pending.level);
                    self.l1_held = true;
                }
                step => debug!(
                    "Trip {}: timeout for {} ignored ({:?})",
                    self.trip_id, pending.level, step
                ),
            }
        }

        self.clock_ms = self.clock_ms.max(now_ms);
        out
    }

    fn view(&self) -> EpisodeView {
        EpisodeView {
            open_corroboration: self.contributing.iter().any(|k| k.is_corroborating()),
            stop_ongoing: self.stop_ongoing && !self.resuming,
            unauthorized_stop: self.unauthorized_stop,
        }
    }

    fn apply_signal(&mut self, signal: &Signal) -> EscalationOutput {
        let mut out = EscalationOutput::default();
        let kind = signal.kind();
        let input = Input::Signal(kind);

        match kind {
            SignalKind::SuspiciousStop => {
                self.stop_ongoing = true;
                self.unauthorized_stop = true;
            }
            SignalKind::StopResolved => {
                self.stop_ongoing = false;
                self.unauthorized_stop = false;
            }
            _ => {}
        }

        let mut step = transition(self.level, &input, &self.view());
        if self.level.is_active() && kind != SignalKind::StopResolved {
            self.contributing.insert(kind);
        }

        while let Step::Advance(to) = step {
            let opened = self.level == AlertLevel::None;
            self.enter(to, TransitionCause::Signal { signal: kind }, signal.describe(), &mut out);
            if opened {
                self.contributing.insert(kind);
                self.apply_deferred(&mut out);
            }
            step = transition(self.level, &input, &self.view());
        }

        match step {
            Step::Advance(_) | Step::Hold => {}
            Step::Defer => {
                debug!(
                    "Trip {}: {} before an episode opened, held",
                    self.trip_id,
                    kind.as_str()
                );
                self.hold(signal);
            }
            Step::Ignore => {
                debug!(
                    "Trip {}: {} with no unauthorized stop in progress, dropped",
                    self.trip_id,
                    kind.as_str()
                );
            }
            Step::Discard => {
                if !self.deferred.is_empty() {
                    debug!(
                        "Trip {}: stop ended, {} held signal(s) dropped",
                        self.trip_id,
                        self.deferred.len()
                    );
                }
                self.deferred.clear();
            }
            Step::Clear => {
                info!("Trip {}: stop ended without corroboration", self.trip_id);
                self.clear(TransitionCause::Signal { signal: kind }, signal.describe(), &mut out);
            }
            Step::PartiallyResolved => {
                self.partially_resolved = true;
                let open_signals: Vec<SignalKind> =
                    self.contributing.iter().copied().filter(|k| k.is_corroborating()).collect();
                warn!(
                    "Trip {}: stop ended, episode {} stays open at {}",
                    self.trip_id, self.episode, self.level
                );
                out.reports.push(Report::PartiallyResolved {
                    timestamp_ms: self.clock_ms,
                    open_signals,
                });
            }
            step @ (Step::NothingToResolve | Step::Stale) => {
                unreachable!("signal produced {:?}", step)
            }
        }
        out
    }

    /// Keep the newest signal per kind and forget anything past the hold window
    fn hold(&mut self, signal: &Signal) {
        let horizon = self.clock_ms.saturating_sub(self.config.hold_window_ms());
        let kind = signal.kind();
        self.deferred.retain(|s| s.kind() != kind && s.at_ms() >= horizon);
        self.deferred.push(signal.clone());
    }

    fn apply_deferred(&mut self, out: &mut EscalationOutput) {
        let horizon = self.clock_ms.saturating_sub(self.config.hold_window_ms());
        let mut held = std::mem::take(&mut self.deferred);
        held.sort_by_key(|s| s.at_ms());

        for signal in held {
            if signal.at_ms() < horizon {
                debug!(
                    "Trip {}: held {} from {}ms expired",
                    self.trip_id,
                    signal.kind().as_str(),
                    signal.at_ms()
                );
                continue;
            }
            info!(
                "Trip {}: applying held {} to episode {}",
                self.trip_id,
                signal.kind().as_str(),
                self.episode
            );
            out.merge(self.apply_signal(&signal));
        }
    }

    fn enter(&mut self, to: AlertLevel, cause: TransitionCause, reason: String, out: &mut EscalationOutput) {
        assert_eq!(
            self.level.next(),
            Some(to),
            "trip {}: alert level cannot move from {} to {}",
            self.trip_id,
            self.level,
            to
        );

        let from = self.level;
        if from == AlertLevel::None {
            self.episode += 1;
            self.partially_resolved = false;
        }
        self.level = to;
        self.l1_held = false;
        self.entered_at_ms = self.clock_ms;

        self.generation += 1;
        self.pending = self.config.timeout_ms(to).map(|timeout| PendingTimeout {
            level: to,
            due_ms: self.clock_ms.saturating_add(timeout),
            generation: self.generation,
        });

        let action = to.entry_action().map(|kind| self.issue(kind, to, reason));
        info!(
            "Trip {}: {} -> {} at {}ms{}",
            self.trip_id,
            from,
            to,
            self.clock_ms,
            action.as_ref().map(|a| format!(" ({})", a.kind.as_str())).unwrap_or_default()
        );

        self.history.push(EscalationRecord {
            time_ms: self.clock_ms,
            episode: self.episode,
            from,
            to,
            cause,
            action_id: action.as_ref().map(|a| a.id.clone()),
        });
        out.actions.extend(action);
    }

    fn clear(&mut self, cause: TransitionCause, reason: String, out: &mut EscalationOutput) {
        let from = self.level;
        let action = self.issue(ActionKind::Log, AlertLevel::None, reason);

        self.level = AlertLevel::None;
        self.entered_at_ms = self.clock_ms;
        self.contributing.clear();
        self.deferred.clear();
        self.partially_resolved = false;
        self.l1_held = false;
        self.generation += 1;
        self.pending = None;

        self.history.push(EscalationRecord {
            time_ms: self.clock_ms,
            episode: self.episode,
            from,
            to: AlertLevel::None,
            cause,
            action_id: Some(action.id.clone()),
        });
        out.actions.push(action);
    }

    fn issue(&mut self, kind: ActionKind, level: AlertLevel, reason: String) -> Action {
        self.action_seq += 1;
        Action {
            id: format!("{}-{:04}", self.trip_id, self.action_seq),
            kind,
            trip_id: self.trip_id.clone(),
            time_ms: self.clock_ms,
            level,
            reason,
            context: self.context.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_context::{RiskLevel, TrafficLevel};
    use telemetry::GeoPoint;

    const SPOT: GeoPoint = GeoPoint { lat: 22.35, lon: 87.60 };

    fn config() -> EscalationConfig {
        EscalationConfig {
            l1_timeout_s: 60,
            l2_timeout_s: 60,
            l3_timeout_s: 30,
            hold_window_s: 120,
        }
    }

    fn suspicious(t_s: u64) -> Signal {
        Signal::SuspiciousStop {
            at_ms: t_s * 1000,
            location: SPOT,
            stopped_for_s: 60,
        }
    }

    fn weight_drop(t_s: u64) -> Signal {
        Signal::WeightDrop {
            at_ms: t_s * 1000,
            drop_fraction: 0.3,
            current_weight_kg: 17_500.0,
        }
    }

    fn person(t_s: u64) -> Signal {
        Signal::PersonDetected {
            at_ms: t_s * 1000,
            confidence: 0.9,
            boxes: 1,
        }
    }

    fn stop_resolved(t_s: u64) -> Signal {
        Signal::StopResolved {
            at_ms: t_s * 1000,
            location: SPOT,
            duration_ms: 90_000,
            authorized: false,
        }
    }

    fn kinds(out: &EscalationOutput) -> Vec<ActionKind> {
        out.actions.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_theft_sequence() {
        let mut engine = EscalationEngine::new("T1", config());

        let out = engine.handle_signal(&suspicious(60));
        assert_eq!(kinds(&out), vec![ActionKind::Log]);
        assert_eq!(engine.level(), AlertLevel::Watchlist);

        let out = engine.handle_signal(&weight_drop(70));
        assert_eq!(kinds(&out), vec![ActionKind::Sms, ActionKind::CallAndCameraOn]);
        assert!(out.actions.iter().all(|a| a.time_ms == 70_000));
        assert_eq!(engine.level(), AlertLevel::Critical);

        let out = engine.handle_signal(&person(80));
        assert_eq!(kinds(&out), vec![ActionKind::Dispatch]);
        assert_eq!(engine.level(), AlertLevel::Emergency);
        assert_eq!(engine.next_deadline(), None);

        let levels: Vec<_> = engine.history().iter().map(|r| r.to).collect();
        assert_eq!(
            levels,
            vec![
                AlertLevel::Watchlist,
                AlertLevel::Warning,
                AlertLevel::Critical,
                AlertLevel::Emergency
            ]
        );
    }

    #[test]
    fn test_repeated_weight_drop_at_critical_is_idempotent() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(60));
        engine.handle_signal(&weight_drop(70));

        let out = engine.handle_signal(&weight_drop(75));
        assert!(out.actions.is_empty());
        assert_eq!(engine.level(), AlertLevel::Critical);
    }

    #[test]
    fn test_l1_timeout_fires_at_due_time() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(100));
        assert_eq!(engine.next_deadline(), Some(160_000));

        assert!(engine.advance_to(159_000).actions.is_empty());
        assert!(engine.advance_to(159_999).actions.is_empty());
        assert_eq!(engine.level(), AlertLevel::Watchlist);

        let out = engine.advance_to(160_000);
        assert_eq!(kinds(&out), vec![ActionKind::Sms]);
        assert_eq!(out.actions[0].time_ms, 160_000);
        assert_eq!(engine.level(), AlertLevel::Warning);
    }

    #[test]
    fn test_long_silence_walks_every_timeout() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(0));

        let out = engine.advance_to(1_000_000);
        assert_eq!(
            kinds(&out),
            vec![ActionKind::Sms, ActionKind::CallAndCameraOn, ActionKind::Dispatch]
        );
        let times: Vec<_> = out.actions.iter().map(|a| a.time_ms).collect();
        assert_eq!(times, vec![60_000, 120_000, 150_000]);
        assert_eq!(engine.clock_ms(), 1_000_000);
    }

    #[test]
    fn test_transition_cancels_pending_timeout() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(0));
        let first = engine.pending_timeout().unwrap();

        engine.handle_signal(&weight_drop(10));
        let pending = engine.pending_timeout().unwrap();
        assert_eq!(pending.level, AlertLevel::Critical);
        assert_eq!(pending.due_ms, 40_000);
        assert!(pending.generation > first.generation);

        // The first L1 deadline passes without effect
        assert!(engine.advance_to(39_999).actions.is_empty());
    }

    #[test]
    fn test_stop_resolved_at_l1_clears() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(60));

        let out = engine.handle_signal(&stop_resolved(90));
        assert_eq!(kinds(&out), vec![ActionKind::Log]);
        assert!(out.actions[0].is_resolution());
        assert!(!out.release_locks);
        assert_eq!(engine.level(), AlertLevel::None);
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn test_stop_resolved_with_corroboration_is_partial() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(60));
        engine.handle_signal(&weight_drop(70));

        let out = engine.handle_signal(&stop_resolved(90));
        assert!(out.actions.is_empty());
        assert_eq!(
            out.reports,
            vec![Report::PartiallyResolved {
                timestamp_ms: 90_000,
                open_signals: vec![SignalKind::WeightDrop],
            }]
        );
        let state = engine.state();
        assert_eq!(state.level, AlertLevel::Critical);
        assert!(state.partially_resolved);

        // Timeout still escalates the open episode
        let out = engine.advance_to(100_000);
        assert_eq!(kinds(&out), vec![ActionKind::Dispatch]);
    }

    #[test]
    fn test_stop_resolved_at_l2_keeps_episode() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(0));
        engine.advance_to(60_000);
        assert_eq!(engine.level(), AlertLevel::Warning);

        let out = engine.handle_signal(&stop_resolved(70));
        assert!(matches!(
            out.reports.as_slice(),
            [Report::PartiallyResolved { open_signals, .. }] if open_signals.is_empty()
        ));
        assert_eq!(engine.level(), AlertLevel::Warning);
    }

    #[test]
    fn test_resolve_clears_and_releases_locks() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(60));
        engine.handle_signal(&weight_drop(70));

        let out = engine.resolve(75_000);
        assert_eq!(kinds(&out), vec![ActionKind::Log]);
        assert!(out.release_locks);
        let state = engine.state();
        assert_eq!(state.level, AlertLevel::None);
        assert!(state.contributing_signals.is_empty());
        assert_eq!(state.next_timeout_ms, None);

        // Stale deadline never fires
        assert!(engine.advance_to(500_000).actions.is_empty());
    }

    #[test]
    fn test_resolve_at_none_reports() {
        let mut engine = EscalationEngine::new("T1", config());
        let out = engine.resolve(5_000);
        assert!(out.actions.is_empty());
        assert_eq!(out.reports, vec![Report::NothingToResolve { timestamp_ms: 5_000 }]);
    }

    #[test]
    fn test_corroboration_before_suspicion_applies_on_open() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.observe_stop(true, false);
        assert!(engine.handle_signal(&person(40)).actions.is_empty());
        assert!(engine.handle_signal(&weight_drop(50)).actions.is_empty());
        assert_eq!(engine.level(), AlertLevel::None);

        let out = engine.handle_signal(&suspicious(60));
        assert_eq!(
            kinds(&out),
            vec![
                ActionKind::Log,
                ActionKind::Sms,
                ActionKind::CallAndCameraOn,
                ActionKind::Dispatch
            ]
        );
        let state = engine.state();
        assert_eq!(state.level, AlertLevel::Emergency);
        assert_eq!(state.contributing_signals.len(), 3);
    }

    #[test]
    fn test_expired_held_signal_dropped() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.observe_stop(true, false);
        engine.handle_signal(&weight_drop(10));
        assert_eq!(engine.deferred_len(), 1);
        let out = engine.handle_signal(&suspicious(200));
        assert_eq!(kinds(&out), vec![ActionKind::Log]);
    }

    #[test]
    fn test_authorized_stop_end_discards_held() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.observe_stop(true, false);
        engine.handle_signal(&weight_drop(10));
        engine.handle_signal(&stop_resolved(20));
        assert_eq!(engine.deferred_len(), 0);
        let out = engine.handle_signal(&suspicious(60));
        assert_eq!(kinds(&out), vec![ActionKind::Log]);
    }

    #[test]
    fn test_corroboration_while_moving_never_escalates() {
        let mut engine = EscalationEngine::new("T1", config());
        assert!(engine.handle_signal(&person(15)).actions.is_empty());
        assert_eq!(engine.deferred_len(), 0);

        engine.observe_stop(true, false);
        let out = engine.handle_signal(&suspicious(90));
        assert_eq!(kinds(&out), vec![ActionKind::Log]);
        assert_eq!(engine.level(), AlertLevel::Watchlist);
        assert!(engine.state().contributing_signals.contains(&SignalKind::SuspiciousStop));
        assert!(!engine.state().contributing_signals.contains(&SignalKind::PersonDetected));
    }

    #[test]
    fn test_held_signals_keep_newest_per_kind() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.observe_stop(true, false);
        for t in 0..10_000 {
            engine.handle_signal(&person(t));
            engine.handle_signal(&weight_drop(t));
        }
        assert_eq!(engine.deferred_len(), 2);

        // Only the newest of each kind replays, one level per kind
        let out = engine.handle_signal(&suspicious(10_000));
        assert_eq!(
            kinds(&out),
            vec![
                ActionKind::Log,
                ActionKind::Sms,
                ActionKind::CallAndCameraOn,
                ActionKind::Dispatch
            ]
        );
    }

    #[test]
    fn test_leaving_unauthorized_stop_drops_held() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.observe_stop(true, false);
        engine.handle_signal(&person(20));
        engine.observe_stop(false, false);
        assert_eq!(engine.deferred_len(), 0);

        engine.observe_stop(true, false);
        let out = engine.handle_signal(&suspicious(60));
        assert_eq!(kinds(&out), vec![ActionKind::Log]);
    }

    #[test]
    fn test_l1_timeout_held_while_resuming() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(0));
        engine.observe_stop(true, true);

        assert!(engine.advance_to(60_000).actions.is_empty());
        assert_eq!(engine.level(), AlertLevel::Watchlist);
        assert_eq!(engine.next_deadline(), None);

        // Resumption confirmed: the stop ends and clears the episode
        engine.observe_stop(false, false);
        let out = engine.handle_signal(&stop_resolved(75));
        assert_eq!(kinds(&out), vec![ActionKind::Log]);
        assert_eq!(engine.level(), AlertLevel::None);
    }

    #[test]
    fn test_held_l1_fires_when_truck_settles_again() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(0));
        engine.observe_stop(true, true);
        engine.advance_to(65_000);

        let out = engine.observe_stop(true, false);
        assert_eq!(kinds(&out), vec![ActionKind::Sms]);
        assert_eq!(out.actions[0].time_ms, 65_000);
        assert_eq!(engine.level(), AlertLevel::Warning);
        assert_eq!(engine.next_deadline(), Some(125_000));
    }

    #[test]
    fn test_huge_timeouts_saturate() {
        let mut engine = EscalationEngine::new(
            "T1",
            EscalationConfig {
                l1_timeout_s: u64::MAX,
                hold_window_s: u64::MAX,
                ..config()
            },
        );
        engine.handle_signal(&suspicious(60));
        assert_eq!(engine.next_deadline(), Some(u64::MAX));
        assert!(engine.advance_to(10_000_000).actions.is_empty());
        assert_eq!(engine.level(), AlertLevel::Watchlist);
    }

    #[test]
    fn test_new_episode_counts_and_ids() {
        let mut engine = EscalationEngine::new("TRK-7", config());
        engine.handle_signal(&suspicious(0));
        engine.handle_signal(&stop_resolved(10));
        let out = engine.handle_signal(&suspicious(100));
        assert_eq!(engine.state().episode, 2);
        assert_eq!(out.actions[0].id, "TRK-7-0003");
    }

    #[test]
    fn test_actions_carry_context() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.set_context(Some(RouteContext {
            risk: RiskLevel::High,
            risk_score: 0.8,
            hotspot: Some("NH6".into()),
            traffic: TrafficLevel::Light,
        }));
        let out = engine.handle_signal(&suspicious(60));
        assert_eq!(out.actions[0].context.as_ref().unwrap().risk, RiskLevel::High);
    }

    #[test]
    fn test_history_serializes_cause() {
        let mut engine = EscalationEngine::new("T1", config());
        engine.handle_signal(&suspicious(0));
        let json = serde_json::to_value(&engine.history()[0]).unwrap();
        assert_eq!(json["cause"], "signal");
        assert_eq!(json["signal"], "suspicious_stop");
        assert_eq!(json["to"], "watchlist");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Event {
            Suspicious,
            Weight,
            Person,
            Wait(u64),
        }

        fn event() -> impl Strategy<Value = Event> {
            prop_oneof![
                Just(Event::Suspicious),
                Just(Event::Weight),
                Just(Event::Person),
                (1u64..200_000).prop_map(Event::Wait),
            ]
        }

        proptest! {
            #[test]
            fn level_never_decreases_without_resolution(events in prop::collection::vec(event(), 1..40)) {
                let mut engine = EscalationEngine::new("P", config());
                let mut now = 0u64;
                let mut last = engine.level();
                for e in events {
                    now += 1_000;
                    let out = match e {
                        Event::Suspicious => engine.handle_signal(&suspicious(now / 1000)),
                        Event::Weight => engine.handle_signal(&weight_drop(now / 1000)),
                        Event::Person => engine.handle_signal(&person(now / 1000)),
                        Event::Wait(ms) => {
                            now += ms;
                            engine.advance_to(now)
                        }
                    };
                    prop_assert!(engine.level() >= last);
                    // Each level's action fires at most once per episode
                    let mut issued: Vec<_> = out.actions.iter().map(|a| a.kind).collect();
                    issued.dedup();
                    prop_assert_eq!(issued.len(), out.actions.len());
                    last = engine.level();
                }
                let entered: Vec<_> = engine.history().iter().map(|r| (r.from, r.to)).collect();
                for (from, to) in entered {
                    prop_assert_eq!(from.next(), Some(to));
                }
            }
        }
    }
}
