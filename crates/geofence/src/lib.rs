//! Geofence Index
//!
//! Authorized stop zones along a trip route and the spatial queries the
//! stop analyzer runs against them:
//! - Point-in-zone (polygon and circular zones)
//! - Nearest zone with distance in metres
//! - Great-circle distance helpers

mod index;
mod zone;

pub use index::GeofenceIndex;
pub use zone::{haversine_m, GeoPoint, Geofence, ZoneKind, ZoneShape, EARTH_RADIUS_M};

use thiserror::Error;

/// Geofence loading errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeofenceError {
    #[error("Zone {id}: polygon needs at least 3 vertices, got {count}")]
    TooFewVertices { id: String, count: usize },

    #[error("Zone {id}: radius must be positive, got {radius_m}")]
    InvalidRadius { id: String, radius_m: f64 },

    #[error("Zone {id}: coordinate ({lat}, {lon}) is out of range")]
    InvalidCoordinate { id: String, lat: f64, lon: f64 },

    #[error("Duplicate zone id: {0}")]
    DuplicateId(String),
}
