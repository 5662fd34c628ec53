//! Sample Validator for Ordering, Range, and Jump Checks

use crate::{TelemetryError, TelemetrySample};
use geofence::haversine_m;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Speed valid range (km/h)
    pub speed_range_kmh: (f64, f64),
    /// Load cell valid range (kg)
    pub weight_range_kg: (f64, f64),
    /// Fastest believable movement between consecutive samples (km/h)
    pub max_plausible_speed_kmh: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            speed_range_kmh: (0.0, 200.0),
            weight_range_kg: (0.0, 60_000.0),
            max_plausible_speed_kmh: 150.0,
        }
    }
}

/// Outcome for a sample that was not rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleCheck {
    /// Sample usable for stop and weight reasoning
    Accepted,
    /// Sample kept for ordering only, excluded from reasoning
    ImplausibleJump {
        distance_m: f64,
        implied_speed_kmh: f64,
    },
}

/// Per-trip validator; remembers the last accepted and last excluded sample
pub struct SampleValidator {
    config: ValidationConfig,
    last_accepted: Option<TelemetrySample>,
    last_excluded: Option<TelemetrySample>,
}

impl SampleValidator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            last_accepted: None,
            last_excluded: None,
        }
    }

    /// Timestamp of the newest sample seen, accepted or excluded
    pub fn last_timestamp_ms(&self) -> Option<u64> {
        let accepted = self.last_accepted.map(|s| s.timestamp_ms);
        let excluded = self.last_excluded.map(|s| s.timestamp_ms);
        accepted.max(excluded)
    }

    /// Validate a single value against a range
    fn validate_range(
        timestamp_ms: u64,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), TelemetryError> {
        if !value.is_finite() || value < range.0 || value > range.1 {
            Err(TelemetryError::OutOfRange {
                timestamp_ms,
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Check a sample. Rejected samples leave the validator unchanged.
    pub fn check(&mut self, sample: &TelemetrySample) -> Result<SampleCheck, TelemetryError> {
        let t = sample.timestamp_ms;

        if let Some(last) = self.last_timestamp_ms() {
            if t <= last {
                warn!("Out-of-order sample at {}ms (last {}ms)", t, last);
                return Err(TelemetryError::OutOfOrder {
                    timestamp_ms: t,
                    last_timestamp_ms: last,
                });
            }
        }

        if !sample.position.is_valid() {
            return Err(TelemetryError::InvalidPosition {
                timestamp_ms: t,
                lat: sample.position.lat,
                lon: sample.position.lon,
            });
        }
        Self::validate_range(t, "speed_kmh", sample.speed_kmh, self.config.speed_range_kmh)?;
        Self::validate_range(t, "weight_kg", sample.weight_kg, self.config.weight_range_kg)?;

        // A jump from the last good fix is forgiven when it agrees with the
        // previous excluded fix, so a real relocation is accepted on the
        // second consistent sample.
        let from_accepted = self.last_accepted.map(|prev| self.implied_speed(&prev, sample));
        let from_excluded = self.last_excluded.map(|prev| self.implied_speed(&prev, sample));
        let limit = self.config.max_plausible_speed_kmh;

        if let Some((distance_m, implied_speed_kmh)) = from_accepted {
            let relocated = from_excluded.map_or(false, |(_, speed)| speed <= limit);
            if implied_speed_kmh > limit && !relocated {
                warn!(
                    "Implausible jump of {:.0}m at {}ms ({:.0} km/h)",
                    distance_m, t, implied_speed_kmh
                );
                self.last_excluded = Some(*sample);
                return Ok(SampleCheck::ImplausibleJump {
                    distance_m,
                    implied_speed_kmh,
                });
            }
        }

        debug!("Sample at {}ms accepted", t);
        self.last_accepted = Some(*sample);
        self.last_excluded = None;
        Ok(SampleCheck::Accepted)
    }

    fn implied_speed(&self, prev: &TelemetrySample, next: &TelemetrySample) -> (f64, f64) {
        let distance_m = haversine_m(prev.position, next.position);
        let dt_s = next.timestamp_ms.saturating_sub(prev.timestamp_ms) as f64 / 1000.0;
        if dt_s <= 0.0 {
            return (distance_m, f64::INFINITY);
        }
        (distance_m, distance_m / dt_s * 3.6)
    }
}

impl Default for SampleValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
