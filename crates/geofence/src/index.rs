//! Geofence index

use crate::{GeoPoint, Geofence, GeofenceError};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Immutable set of zones, shared read-only across trips
#[derive(Debug, Clone, Default)]
pub struct GeofenceIndex {
    zones: Vec<Geofence>,
}

impl GeofenceIndex {
    /// Build an index, validating every zone
    pub fn new(zones: Vec<Geofence>) -> Result<Self, GeofenceError> {
        let mut seen = HashSet::new();
        for zone in &zones {
            zone.validate()?;
            if !seen.insert(zone.id.as_str()) {
                return Err(GeofenceError::DuplicateId(zone.id.clone()));
            }
        }

        if zones.is_empty() {
            warn!("Geofence index created with no zones, every stop will be treated as unauthorized");
        } else {
            info!("Loaded {} geofences", zones.len());
        }

        Ok(Self { zones })
    }

    /// Index with no zones
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn zones(&self) -> &[Geofence] {
        &self.zones
    }

    /// Whether the point lies inside any authorized zone
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.authorized_zone_at(point).is_some()
    }

    /// First authorized zone containing the point
    pub fn authorized_zone_at(&self, point: GeoPoint) -> Option<&Geofence> {
        let zone = self
            .zones
            .iter()
            .find(|z| z.authorized_stop_allowed && z.contains(point));
        if let Some(z) = zone {
            debug!("Point ({:.5}, {:.5}) inside zone {}", point.lat, point.lon, z.id);
        }
        zone
    }

    /// Nearest zone of any kind and the distance to its boundary (metres)
    pub fn nearest_zone(&self, point: GeoPoint) -> Option<(&Geofence, f64)> {
        self.zones
            .iter()
            .map(|z| (z, z.distance_m(point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZoneKind;

    fn corridor() -> GeofenceIndex {
        GeofenceIndex::new(vec![
            Geofence::circle("jsr", "Jamshedpur Plant", GeoPoint::new(22.8046, 86.2029), 2_000.0)
                .with_max_stop_minutes(120),
            Geofence::circle("kgp", "Kharagpur Rest Stop", GeoPoint::new(22.3460, 87.3236), 500.0)
                .with_kind(ZoneKind::RestStop)
                .with_max_stop_minutes(30),
            Geofence::polygon(
                "yard",
                "Impound Yard",
                vec![
                    GeoPoint::new(22.50, 88.00),
                    GeoPoint::new(22.50, 88.01),
                    GeoPoint::new(22.51, 88.01),
                    GeoPoint::new(22.51, 88.00),
                ],
            )
            .unauthorized(),
        ])
        .unwrap()
    }

    #[test]
    fn test_contains_authorized_zone() {
        let index = corridor();
        assert!(index.contains(GeoPoint::new(22.8050, 86.2030)));
        assert!(!index.contains(GeoPoint::new(22.6, 87.0)));
    }

    #[test]
    fn test_unauthorized_zone_does_not_authorize() {
        let index = corridor();
        let p = GeoPoint::new(22.505, 88.005);
        assert!(!index.contains(p));
        let (zone, distance) = index.nearest_zone(p).unwrap();
        assert_eq!(zone.id, "yard");
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn test_nearest_zone() {
        let index = corridor();
        let (zone, distance) = index.nearest_zone(GeoPoint::new(22.35, 87.33)).unwrap();
        assert_eq!(zone.id, "kgp");
        assert!(distance > 0.0 && distance < 1_000.0);
    }

    #[test]
    fn test_empty_index() {
        let index = GeofenceIndex::empty();
        assert!(index.is_empty());
        assert!(!index.contains(GeoPoint::new(0.0, 0.0)));
        assert!(index.nearest_zone(GeoPoint::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let zone = Geofence::circle("a", "A", GeoPoint::new(0.0, 0.0), 10.0);
        let err = GeofenceIndex::new(vec![zone.clone(), zone]).unwrap_err();
        assert_eq!(err, GeofenceError::DuplicateId("a".to_string()));
    }

    #[test]
    fn test_index_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeofenceIndex>();
    }
}
