//! Zone geometry

use crate::GeofenceError;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance computations (metres)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether the point is a finite coordinate on the globe
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Great-circle distance between two points (metres)
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Purpose of a zone along the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    #[default]
    Warehouse,
    RestStop,
    Checkpoint,
    Destination,
}

/// Zone outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneShape {
    /// Simple (non self-intersecting) polygon, vertices in order
    Polygon { vertices: Vec<GeoPoint> },
    /// Circle around a centre point
    Circle { center: GeoPoint, radius_m: f64 },
}

impl ZoneShape {
    /// Point-in-zone test (even-odd rule for polygons)
    pub fn contains(&self, point: GeoPoint) -> bool {
        match self {
            ZoneShape::Polygon { vertices } => polygon_contains(vertices, point),
            ZoneShape::Circle { center, radius_m } => haversine_m(*center, point) <= *radius_m,
        }
    }

    /// Distance from the point to the zone boundary, 0 when inside (metres)
    pub fn distance_m(&self, point: GeoPoint) -> f64 {
        if self.contains(point) {
            return 0.0;
        }
        match self {
            ZoneShape::Polygon { vertices } => {
                let n = vertices.len();
                (0..n)
                    .map(|i| segment_distance_m(point, vertices[i], vertices[(i + 1) % n]))
                    .fold(f64::INFINITY, f64::min)
            }
            ZoneShape::Circle { center, radius_m } => {
                (haversine_m(*center, point) - radius_m).max(0.0)
            }
        }
    }
}

fn polygon_contains(vertices: &[GeoPoint], point: GeoPoint) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    // Ray cast along +lon, x = lon, y = lat
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.lat > point.lat) != (b.lat > point.lat) {
            let crossing = (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if point.lon < crossing {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Distance from a point to a segment on a local equirectangular plane
/// centred on the point. Accurate for zone-sized distances.
fn segment_distance_m(point: GeoPoint, a: GeoPoint, b: GeoPoint) -> f64 {
    let k = point.lat.to_radians().cos();
    let project = |q: GeoPoint| {
        (
            (q.lon - point.lon).to_radians() * k * EARTH_RADIUS_M,
            (q.lat - point.lat).to_radians() * EARTH_RADIUS_M,
        )
    };
    let (ax, ay) = project(a);
    let (bx, by) = project(b);
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}

fn default_true() -> bool {
    true
}

/// A named zone where stops may be authorized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    /// Unique zone identifier
    pub id: String,

    /// Human-readable label
    pub label: String,

    /// Zone outline
    pub shape: ZoneShape,

    /// Purpose of the zone
    #[serde(default)]
    pub kind: ZoneKind,

    /// Whether stopping inside this zone is authorized
    #[serde(default = "default_true")]
    pub authorized_stop_allowed: bool,

    /// Longest expected stop inside the zone (minutes)
    #[serde(default)]
    pub max_stop_minutes: Option<u32>,
}

impl Geofence {
    /// Create an authorized polygon zone
    pub fn polygon(id: impl Into<String>, label: impl Into<String>, vertices: Vec<GeoPoint>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape: ZoneShape::Polygon { vertices },
            kind: ZoneKind::default(),
            authorized_stop_allowed: true,
            max_stop_minutes: None,
        }
    }

    /// Create an authorized circular zone
    pub fn circle(
        id: impl Into<String>,
        label: impl Into<String>,
        center: GeoPoint,
        radius_m: f64,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape: ZoneShape::Circle { center, radius_m },
            kind: ZoneKind::default(),
            authorized_stop_allowed: true,
            max_stop_minutes: None,
        }
    }

    pub fn with_kind(mut self, kind: ZoneKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_max_stop_minutes(mut self, minutes: u32) -> Self {
        self.max_stop_minutes = Some(minutes);
        self
    }

    /// Mark the zone as known but not authorized for stops
    pub fn unauthorized(mut self) -> Self {
        self.authorized_stop_allowed = false;
        self
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        self.shape.contains(point)
    }

    pub fn distance_m(&self, point: GeoPoint) -> f64 {
        self.shape.distance_m(point)
    }

    /// Check the zone geometry
    pub fn validate(&self) -> Result<(), GeofenceError> {
        let check = |p: &GeoPoint| {
            if p.is_valid() {
                Ok(())
            } else {
                Err(GeofenceError::InvalidCoordinate {
                    id: self.id.clone(),
                    lat: p.lat,
                    lon: p.lon,
                })
            }
        };

        match &self.shape {
            ZoneShape::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(GeofenceError::TooFewVertices {
                        id: self.id.clone(),
                        count: vertices.len(),
                    });
                }
                vertices.iter().try_for_each(check)
            }
            ZoneShape::Circle { center, radius_m } => {
                if !(radius_m.is_finite() && *radius_m > 0.0) {
                    return Err(GeofenceError::InvalidRadius {
                        id: self.id.clone(),
                        radius_m: *radius_m,
                    });
                }
                check(center)
            }
        }
    }
}
