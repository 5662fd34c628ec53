//! Weight Analyzer
//!
//! Detects sudden cargo weight loss against a rolling baseline taken while
//! the truck is moving. Drops are only raised during stops outside
//! authorized zones; deliveries at authorized zones are expected to reduce
//! the load.

mod analyzer;
mod baseline;
mod profile;

pub use analyzer::{WeightAnalyzer, WeightDropEvent, WeightOutput};
pub use baseline::WeightBaseline;
pub use profile::{WeightProfile, WeightStatus, WeightSummary, DEFAULT_PACKAGING_KG};

use serde::{Deserialize, Serialize};

/// Weight analysis thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightConfig {
    /// Moving samples averaged into the baseline
    pub baseline_window: usize,
    /// Fractional loss versus baseline that raises a drop (0.15 = 15%)
    pub drop_threshold: f64,
    /// Additional loss needed to raise a drop again in the same stop
    pub rearm_delta: f64,
    /// Slower samples stay out of the baseline even before a stop is
    /// confirmed (km/h)
    pub min_baseline_speed_kmh: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            baseline_window: 10,
            drop_threshold: 0.15,
            rearm_delta: 0.05,
            min_baseline_speed_kmh: 5.0,
        }
    }
}

/// Stop state the weight analyzer is gated on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopContext {
    Moving,
    Stopped { authorized: bool },
}
