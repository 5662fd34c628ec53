//! Fleet-wide alert counts

use crate::{AlertLevel, AlertState};
use serde::{Deserialize, Serialize};

/// Count of trips per active alert level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_active: usize,
    pub watchlist: usize,
    pub warning: usize,
    pub critical: usize,
    pub emergency: usize,
}

impl AlertSummary {
    pub fn record(&mut self, level: AlertLevel) {
        let slot = match level {
            AlertLevel::None => return,
            AlertLevel::Watchlist => &mut self.watchlist,
            AlertLevel::Warning => &mut self.warning,
            AlertLevel::Critical => &mut self.critical,
            AlertLevel::Emergency => &mut self.emergency,
        };
        *slot += 1;
        self.total_active += 1;
    }
}

impl<'a> FromIterator<&'a AlertState> for AlertSummary {
    fn from_iter<I: IntoIterator<Item = &'a AlertState>>(iter: I) -> Self {
        let mut summary = AlertSummary::default();
        for state in iter {
            summary.record(state.level);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn state(level: AlertLevel) -> AlertState {
        AlertState {
            trip_id: "T".into(),
            level,
            entered_at_ms: 0,
            contributing_signals: BTreeSet::new(),
            episode: 1,
            partially_resolved: false,
            next_timeout_ms: None,
        }
    }

    #[test]
    fn test_counts_active_levels_only() {
        let states = [
            state(AlertLevel::None),
            state(AlertLevel::Watchlist),
            state(AlertLevel::Critical),
            state(AlertLevel::Critical),
        ];
        let summary: AlertSummary = states.iter().collect();
        assert_eq!(summary.total_active, 3);
        assert_eq!(summary.watchlist, 1);
        assert_eq!(summary.critical, 2);
        assert_eq!(summary.emergency, 0);
    }
}
