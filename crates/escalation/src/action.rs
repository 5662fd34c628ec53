//! Issued actions

use crate::{ActionKind, AlertLevel};
use route_context::RouteContext;
use serde::{Deserialize, Serialize};

/// Action issued by a transition. Issued means handed off, not delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// `{trip_id}-{sequence}`, unique within the run
    pub id: String,
    pub kind: ActionKind,
    pub trip_id: String,
    pub time_ms: u64,
    /// Level entered by the transition; `None` for resolutions
    pub level: AlertLevel,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RouteContext>,
}

impl Action {
    pub fn is_resolution(&self) -> bool {
        self.level == AlertLevel::None
    }
}
