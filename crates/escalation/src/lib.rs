//! Alert Escalation
//!
//! Per-trip alert lifecycle driven by detection signals and timeouts:
//! - L1 Watchlist: logged
//! - L2 Warning: SMS to the driver
//! - L3 Critical: call the driver and switch the cargo camera on
//! - L4 Emergency: dispatch security
//!
//! Levels are climbed one step at a time, either by a corroborating signal
//! or by the current level's timeout on a logical clock.

mod action;
mod engine;
mod level;
mod summary;
mod transition;

pub use action::Action;
pub use engine::{AlertState, EscalationEngine, EscalationOutput, EscalationRecord, PendingTimeout, TransitionCause};
pub use level::{ActionKind, AlertLevel};
pub use summary::AlertSummary;
pub use transition::{transition, EpisodeView, Input, Step};

use serde::{Deserialize, Serialize};

/// Escalation timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Time at Watchlist before SMS, while the stop persists (seconds)
    pub l1_timeout_s: u64,
    /// Time at Warning before calling the driver (seconds)
    pub l2_timeout_s: u64,
    /// Time at Critical before dispatching security (seconds)
    pub l3_timeout_s: u64,
    /// How long a corroborating signal seen before the episode opened stays
    /// eligible to apply (seconds)
    pub hold_window_s: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            l1_timeout_s: 300,
            l2_timeout_s: 300,
            l3_timeout_s: 180,
            hold_window_s: 600,
        }
    }
}

impl EscalationConfig {
    /// Timeout for leaving `level`, if it has one
    pub fn timeout_ms(&self, level: AlertLevel) -> Option<u64> {
        let secs = match level {
            AlertLevel::Watchlist => self.l1_timeout_s,
            AlertLevel::Warning => self.l2_timeout_s,
            AlertLevel::Critical => self.l3_timeout_s,
            AlertLevel::None | AlertLevel::Emergency => return None,
        };
        Some(secs.saturating_mul(1000))
    }

    pub(crate) fn hold_window_ms(&self) -> u64 {
        self.hold_window_s.saturating_mul(1000)
    }
}
