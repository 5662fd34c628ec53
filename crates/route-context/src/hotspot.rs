//! Theft hotspot lookup

use crate::{ContextProvider, RiskLevel, RouteContext, TrafficLevel};
use geofence::{haversine_m, GeoPoint};
use serde::{Deserialize, Serialize};
use tracing::debug;

const HIGH_RISK_RADIUS_M: f64 = 50_000.0;
const MEDIUM_RISK_RADIUS_M: f64 = 100_000.0;
const MEDIUM_RISK_SCORE: f64 = 0.4;
const LOW_RISK_SCORE: f64 = 0.1;

/// Location with a history of cargo theft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub name: String,
    pub location: GeoPoint,
    /// Score reported when inside the high-risk radius
    pub risk_factor: f64,
}

/// Distance-based risk from a table of known hotspots
#[derive(Debug, Clone, Default)]
pub struct HotspotMap {
    hotspots: Vec<Hotspot>,
    traffic: TrafficLevel,
}

impl HotspotMap {
    pub fn new(hotspots: Vec<Hotspot>) -> Self {
        Self {
            hotspots,
            traffic: TrafficLevel::default(),
        }
    }

    /// Traffic level reported with every lookup
    pub fn with_traffic(mut self, traffic: TrafficLevel) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    fn nearest(&self, point: GeoPoint) -> Option<(&Hotspot, f64)> {
        self.hotspots
            .iter()
            .map(|h| (h, haversine_m(point, h.location)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn risk_at(&self, point: GeoPoint) -> (RiskLevel, f64, Option<&Hotspot>) {
        match self.nearest(point) {
            Some((hotspot, d)) if d <= HIGH_RISK_RADIUS_M => {
                debug!("{:.0}m from hotspot {}", d, hotspot.name);
                (RiskLevel::High, hotspot.risk_factor, Some(hotspot))
            }
            Some((_, d)) if d <= MEDIUM_RISK_RADIUS_M => (RiskLevel::Medium, MEDIUM_RISK_SCORE, None),
            _ => (RiskLevel::Low, LOW_RISK_SCORE, None),
        }
    }
}

impl ContextProvider for HotspotMap {
    fn context_at(&self, point: GeoPoint, _timestamp_ms: u64) -> RouteContext {
        let (risk, risk_score, hotspot) = self.risk_at(point);
        RouteContext {
            risk,
            risk_score,
            hotspot: hotspot.map(|h| h.name.clone()),
            traffic: self.traffic,
        }
    }
}
