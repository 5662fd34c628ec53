//! Trip weight profile

use serde::{Deserialize, Serialize};

/// Tarp, straps and pallets assumed when a trip is auto-registered (kg)
pub const DEFAULT_PACKAGING_KG: f64 = 50.0;

const ACCEPTABLE_LOSS_KG: f64 = 20.0;
const MINOR_LOSS_KG: f64 = 50.0;
const SUSPICIOUS_LOSS_KG: f64 = 200.0;

/// Weight tagged at trip start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightProfile {
    pub total_weight_kg: f64,
    pub packaging_weight_kg: f64,
    pub registered_at_ms: u64,
}

impl WeightProfile {
    pub fn cargo_weight_kg(&self) -> f64 {
        (self.total_weight_kg - self.packaging_weight_kg).max(0.0)
    }
}

/// Overall loss classification against the starting weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightStatus {
    /// Within settling and sensor noise
    Normal,
    Minor,
    Suspicious,
    Critical,
}

impl WeightStatus {
    pub fn from_loss_kg(loss_kg: f64) -> Self {
        if loss_kg <= ACCEPTABLE_LOSS_KG {
            WeightStatus::Normal
        } else if loss_kg <= MINOR_LOSS_KG {
            WeightStatus::Minor
        } else if loss_kg <= SUSPICIOUS_LOSS_KG {
            WeightStatus::Suspicious
        } else {
            WeightStatus::Critical
        }
    }
}

/// Trip weight summary for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSummary {
    pub initial_weight_kg: f64,
    pub packaging_weight_kg: f64,
    pub current_weight_kg: f64,
    pub weight_loss_kg: f64,
    pub cargo_remaining_kg: f64,
    pub cargo_remaining_percent: f64,
    pub status: WeightStatus,
    pub drop_events: usize,
}

impl WeightSummary {
    pub(crate) fn compute(profile: &WeightProfile, current_weight_kg: f64, drop_events: usize) -> Self {
        let cargo = profile.cargo_weight_kg();
        let weight_loss_kg = profile.total_weight_kg - current_weight_kg;
        let cargo_remaining_kg = (cargo - weight_loss_kg).max(0.0);
        let cargo_remaining_percent = if cargo > 0.0 {
            cargo_remaining_kg / cargo * 100.0
        } else {
            100.0
        };

        Self {
            initial_weight_kg: profile.total_weight_kg,
            packaging_weight_kg: profile.packaging_weight_kg,
            current_weight_kg,
            weight_loss_kg,
            cargo_remaining_kg,
            cargo_remaining_percent,
            status: WeightStatus::from_loss_kg(weight_loss_kg),
            drop_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_bands() {
        assert_eq!(WeightStatus::from_loss_kg(-5.0), WeightStatus::Normal);
        assert_eq!(WeightStatus::from_loss_kg(20.0), WeightStatus::Normal);
        assert_eq!(WeightStatus::from_loss_kg(45.0), WeightStatus::Minor);
        assert_eq!(WeightStatus::from_loss_kg(150.0), WeightStatus::Suspicious);
        assert_eq!(WeightStatus::from_loss_kg(750.0), WeightStatus::Critical);
    }

    #[test]
    fn test_summary_percentages() {
        let profile = WeightProfile {
            total_weight_kg: 25_050.0,
            packaging_weight_kg: 50.0,
            registered_at_ms: 0,
        };
        let summary = WeightSummary::compute(&profile, 20_050.0, 1);
        assert_eq!(summary.weight_loss_kg, 5_000.0);
        assert_eq!(summary.cargo_remaining_kg, 20_000.0);
        assert!((summary.cargo_remaining_percent - 80.0).abs() < 1e-9);
        assert_eq!(summary.status, WeightStatus::Critical);
    }
}
