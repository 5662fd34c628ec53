//! Stop Analyzer
//!
//! Per-trip MOVING -> STOPPED -> MOVING state machine:
//! - Debounced stop confirmation (ignores traffic-light crawls)
//! - One-shot authorized/suspicious classification against the geofence index
//! - Suspicious-stop and stop-resolved signals
//! - Finalized stop events with exact durations

mod analyzer;
mod event;

pub use analyzer::{StopAnalyzer, StopOutput};
pub use event::StopEvent;

use serde::{Deserialize, Serialize};

/// Motion state of the truck as seen by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Moving,
    Stopped,
}

/// Stop detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopConfig {
    /// Speed below which the truck counts as stationary (km/h)
    pub stop_speed_threshold_kmh: f64,
    /// Time below threshold before a stop is confirmed (seconds)
    pub stop_confirm_s: u64,
    /// Time above threshold before movement is confirmed (seconds)
    pub resume_confirm_s: u64,
    /// Unauthorized stop length that raises a suspicious-stop signal (seconds)
    pub suspicious_stop_duration_s: u64,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            stop_speed_threshold_kmh: 5.0,
            stop_confirm_s: 60,
            resume_confirm_s: 15,
            suspicious_stop_duration_s: 600, // 10 minutes
        }
    }
}

impl StopConfig {
    pub(crate) fn stop_confirm_ms(&self) -> u64 {
        self.stop_confirm_s.saturating_mul(1000)
    }

    pub(crate) fn resume_confirm_ms(&self) -> u64 {
        self.resume_confirm_s.saturating_mul(1000)
    }

    pub(crate) fn suspicious_ms(&self) -> u64 {
        self.suspicious_stop_duration_s.saturating_mul(1000)
    }
}
