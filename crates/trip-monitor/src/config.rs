//! Engine thresholds

use crate::ConfigError;
use escalation::EscalationConfig;
use serde::{Deserialize, Serialize};
use stop_analyzer::StopConfig;
use telemetry::ValidationConfig;
use weight_analyzer::WeightConfig;

/// Longest accepted duration setting: one week
const MAX_DURATION_S: u64 = 7 * 24 * 60 * 60;

/// Every tunable threshold of the detection pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Speed below which the truck counts as stationary (km/h)
    pub stop_speed_threshold_kmh: f64,
    /// Time below threshold before a stop is confirmed (seconds)
    pub stop_confirm_s: u64,
    /// Time above threshold before movement is confirmed (seconds)
    pub resume_confirm_s: u64,
    /// Unauthorized stop length that raises a suspicious stop (seconds)
    pub suspicious_stop_duration_s: u64,

    /// Moving samples averaged into the weight baseline
    pub baseline_window: usize,
    /// Fractional weight loss that raises a drop
    pub weight_drop_threshold: f64,
    /// Additional loss needed to raise a drop again in the same stop
    pub weight_drop_rearm_delta: f64,

    /// Minimum confidence for a person detection to count
    pub detection_confidence_threshold: f64,

    /// Escalation timeouts (seconds)
    pub l1_timeout_s: u64,
    pub l2_timeout_s: u64,
    pub l3_timeout_s: u64,
    /// How long an early corroborating signal stays eligible (seconds)
    pub corroboration_hold_s: u64,

    /// Fastest believable movement between samples (km/h)
    pub max_plausible_speed_kmh: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stop_speed_threshold_kmh: 5.0,
            stop_confirm_s: 60,
            resume_confirm_s: 15,
            suspicious_stop_duration_s: 600,
            baseline_window: 10,
            weight_drop_threshold: 0.15,
            weight_drop_rearm_delta: 0.05,
            detection_confidence_threshold: 0.6,
            l1_timeout_s: 300,
            l2_timeout_s: 300,
            l3_timeout_s: 180,
            corroboration_hold_s: 600,
            max_plausible_speed_kmh: 150.0,
        }
    }
}

impl EngineConfig {
    /// High-value cargo on a known-risk corridor (faster reactions)
    pub fn strict() -> Self {
        Self {
            suspicious_stop_duration_s: 300,
            weight_drop_threshold: 0.05,
            detection_confidence_threshold: 0.5,
            l1_timeout_s: 120,
            l2_timeout_s: 120,
            l3_timeout_s: 60,
            ..Default::default()
        }
    }

    /// Long-haul routes with frequent unplanned halts
    pub fn lenient() -> Self {
        Self {
            suspicious_stop_duration_s: 1200,
            weight_drop_threshold: 0.25,
            detection_confidence_threshold: 0.75,
            l1_timeout_s: 600,
            l2_timeout_s: 600,
            l3_timeout_s: 300,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_f64("stop_speed_threshold_kmh", self.stop_speed_threshold_kmh)?;
        duration_s("stop_confirm_s", self.stop_confirm_s)?;
        duration_s("resume_confirm_s", self.resume_confirm_s)?;
        duration_s("suspicious_stop_duration_s", self.suspicious_stop_duration_s)?;
        positive_u64("baseline_window", self.baseline_window as u64)?;
        fraction("weight_drop_threshold", self.weight_drop_threshold, false)?;
        fraction("weight_drop_rearm_delta", self.weight_drop_rearm_delta, false)?;
        fraction("detection_confidence_threshold", self.detection_confidence_threshold, true)?;
        duration_s("l1_timeout_s", self.l1_timeout_s)?;
        duration_s("l2_timeout_s", self.l2_timeout_s)?;
        duration_s("l3_timeout_s", self.l3_timeout_s)?;
        duration_s("corroboration_hold_s", self.corroboration_hold_s)?;
        positive_f64("max_plausible_speed_kmh", self.max_plausible_speed_kmh)?;
        Ok(())
    }

    pub fn stop_config(&self) -> StopConfig {
        StopConfig {
            stop_speed_threshold_kmh: self.stop_speed_threshold_kmh,
            stop_confirm_s: self.stop_confirm_s,
            resume_confirm_s: self.resume_confirm_s,
            suspicious_stop_duration_s: self.suspicious_stop_duration_s,
        }
    }

    pub fn weight_config(&self) -> WeightConfig {
        WeightConfig {
            baseline_window: self.baseline_window,
            drop_threshold: self.weight_drop_threshold,
            rearm_delta: self.weight_drop_rearm_delta,
            min_baseline_speed_kmh: self.stop_speed_threshold_kmh,
        }
    }

    pub fn escalation_config(&self) -> EscalationConfig {
        EscalationConfig {
            l1_timeout_s: self.l1_timeout_s,
            l2_timeout_s: self.l2_timeout_s,
            l3_timeout_s: self.l3_timeout_s,
            hold_window_s: self.corroboration_hold_s,
        }
    }

    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            max_plausible_speed_kmh: self.max_plausible_speed_kmh,
            ..Default::default()
        }
    }
}

fn positive_u64(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            expected: "greater than zero",
            value: value.to_string(),
        });
    }
    Ok(())
}

fn positive_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Invalid {
            field,
            expected: "a positive number",
            value: value.to_string(),
        });
    }
    Ok(())
}

fn duration_s(field: &'static str, value: u64) -> Result<(), ConfigError> {
    positive_u64(field, value)?;
    if value > MAX_DURATION_S {
        return Err(ConfigError::Invalid {
            field,
            expected: "at most one week (604800 s)",
            value: value.to_string(),
        });
    }
    Ok(())
}

/// In (0, 1), or [0, 1] when `inclusive`
fn fraction(field: &'static str, value: f64, inclusive: bool) -> Result<(), ConfigError> {
    let ok = if inclusive {
        (0.0..=1.0).contains(&value)
    } else {
        value > 0.0 && value < 1.0
    };
    if !ok {
        return Err(ConfigError::Invalid {
            field,
            expected: if inclusive { "within [0, 1]" } else { "within (0, 1)" },
            value: value.to_string(),
        });
    }
    Ok(())
}
