//! Route Context
//!
//! Route risk and live traffic, consumed only to annotate alerts. Nothing
//! here gates an escalation decision.

mod hotspot;

pub use hotspot::{Hotspot, HotspotMap};

use geofence::GeoPoint;
use serde::{Deserialize, Serialize};

/// Theft risk along the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Live traffic condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLevel {
    #[default]
    Light,
    Moderate,
    Heavy,
    Jam,
}

impl TrafficLevel {
    /// Typical delay attributed to the condition
    pub fn delay_minutes(&self) -> u32 {
        match self {
            TrafficLevel::Light => 0,
            TrafficLevel::Moderate => 10,
            TrafficLevel::Heavy => 25,
            TrafficLevel::Jam => 45,
        }
    }
}

/// Annotation attached to issued actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteContext {
    pub risk: RiskLevel,
    pub risk_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotspot: Option<String>,
    pub traffic: TrafficLevel,
}

/// Source of route context; live feeds plug in here
pub trait ContextProvider: Send + Sync {
    fn context_at(&self, point: GeoPoint, timestamp_ms: u64) -> RouteContext;
}

/// Fixed context regardless of position
#[derive(Debug, Clone)]
pub struct StaticContext(pub RouteContext);

impl ContextProvider for StaticContext {
    fn context_at(&self, _point: GeoPoint, _timestamp_ms: u64) -> RouteContext {
        self.0.clone()
    }
}
