//! Alert levels and response actions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Escalation level, ordered by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    None,
    Watchlist,
    Warning,
    Critical,
    Emergency,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 5] = [
        AlertLevel::None,
        AlertLevel::Watchlist,
        AlertLevel::Warning,
        AlertLevel::Critical,
        AlertLevel::Emergency,
    ];

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// The level directly above, if any
    pub fn next(&self) -> Option<AlertLevel> {
        match self {
            AlertLevel::None => Some(AlertLevel::Watchlist),
            AlertLevel::Watchlist => Some(AlertLevel::Warning),
            AlertLevel::Warning => Some(AlertLevel::Critical),
            AlertLevel::Critical => Some(AlertLevel::Emergency),
            AlertLevel::Emergency => None,
        }
    }

    /// Action fired once when the level is entered
    pub fn entry_action(&self) -> Option<ActionKind> {
        match self {
            AlertLevel::None => None,
            AlertLevel::Watchlist => Some(ActionKind::Log),
            AlertLevel::Warning => Some(ActionKind::Sms),
            AlertLevel::Critical => Some(ActionKind::CallAndCameraOn),
            AlertLevel::Emergency => Some(ActionKind::Dispatch),
        }
    }

    /// Operator-facing code (L0..L4)
    pub fn code(&self) -> &'static str {
        match self {
            AlertLevel::None => "L0",
            AlertLevel::Watchlist => "L1",
            AlertLevel::Warning => "L2",
            AlertLevel::Critical => "L3",
            AlertLevel::Emergency => "L4",
        }
    }

    pub fn is_active(&self) -> bool {
        *self != AlertLevel::None
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertLevel::None => "none",
            AlertLevel::Watchlist => "watchlist",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
            AlertLevel::Emergency => "emergency",
        };
        write!(f, "{} ({})", self.code(), name)
    }
}

/// Response handed to the external dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Log,
    Sms,
    CallAndCameraOn,
    Dispatch,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Log => "log",
            ActionKind::Sms => "sms",
            ActionKind::CallAndCameraOn => "call_and_camera_on",
            ActionKind::Dispatch => "dispatch",
        }
    }
}
