//! Escalation transition table

use crate::AlertLevel;
use telemetry::SignalKind;

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Signal(SignalKind),
    /// Timeout scheduled when the given level was entered
    Timeout(AlertLevel),
    Resolve,
}

/// Episode facts the table depends on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeView {
    /// A WeightDrop or PersonDetected contributed to the episode
    pub open_corroboration: bool,
    pub stop_ongoing: bool,
    /// A confirmed stop outside every authorized zone is in progress
    pub unauthorized_stop: bool,
}

/// Outcome of one table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Enter the next level and fire its action
    Advance(AlertLevel),
    /// Close the episode and return to None
    Clear,
    /// Record the input, no level change
    Hold,
    /// Stop ended while the episode stays open
    PartiallyResolved,
    /// Resolve received while nothing is open
    NothingToResolve,
    /// Corroboration during an unauthorized stop before the episode opened; kept for later
    Defer,
    /// Corroboration at None with no unauthorized stop to attach to
    Ignore,
    /// Stop ended before an episode opened; deferred corroborations dropped
    Discard,
    /// Timeout for a level no longer current
    Stale,
}

/// Level a signal drives the episode towards
fn signal_target(kind: SignalKind) -> Option<AlertLevel> {
    match kind {
        SignalKind::SuspiciousStop => Some(AlertLevel::Watchlist),
        SignalKind::WeightDrop => Some(AlertLevel::Critical),
        SignalKind::PersonDetected => Some(AlertLevel::Emergency),
        SignalKind::StopResolved => None,
    }
}

/// One step of the escalation table.
///
/// A signal whose target is more than one level above `level` yields only
/// the next level; callers re-apply the same input until it holds.
pub fn transition(level: AlertLevel, input: &Input, episode: &EpisodeView) -> Step {
    match *input {
        Input::Resolve => {
            if level.is_active() {
                Step::Clear
            } else {
                Step::NothingToResolve
            }
        }

        Input::Timeout(scheduled) => {
            if scheduled != level {
                return Step::Stale;
            }
            match level {
                AlertLevel::Watchlist if !episode.stop_ongoing => Step::Hold,
                AlertLevel::Watchlist | AlertLevel::Warning | AlertLevel::Critical => {
                    level.next().map_or(Step::Hold, Step::Advance)
                }
                AlertLevel::None | AlertLevel::Emergency => Step::Stale,
            }
        }

        Input::Signal(SignalKind::StopResolved) => match level {
            AlertLevel::None => Step::Discard,
            AlertLevel::Watchlist if !episode.open_corroboration => Step::Clear,
            _ => Step::PartiallyResolved,
        },

        Input::Signal(kind) => {
            let Some(target) = signal_target(kind) else {
                return Step::Hold;
            };
            if level == AlertLevel::None && kind.is_corroborating() {
                return if episode.unauthorized_stop { Step::Defer } else { Step::Ignore };
            }
            match level.next() {
                Some(next) if target > level => Step::Advance(next),
                _ => Step::Hold,
            }
        }
    }
}
