//! Event Log Implementation

use crate::LogError;
use escalation::{Action, ActionKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use stop_analyzer::StopEvent;
use telemetry::Report;
use tracing::{debug, info};
use weight_analyzer::WeightDropEvent;

/// Report tagged with the trip it concerns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub trip_id: String,
    #[serde(flatten)]
    pub report: Report,
}

/// Per-stream retention limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub max_actions: usize,
    pub max_stops: usize,
    pub max_weight_drops: usize,
    pub max_reports: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_actions: 10_000,
            max_stops: 10_000,
            max_weight_drops: 10_000,
            max_reports: 50_000,
        }
    }
}

/// Query filter; newest records first
#[derive(Debug, Clone, Deserialize)]
pub struct LogQuery {
    pub trip_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            trip_id: None,
            limit: default_limit(),
        }
    }
}

impl LogQuery {
    pub fn trip(trip_id: impl Into<String>) -> Self {
        Self {
            trip_id: Some(trip_id.into()),
            ..Default::default()
        }
    }

    fn matches(&self, trip_id: &str) -> bool {
        self.trip_id.as_deref().map_or(true, |t| t == trip_id)
    }
}

/// Run-scoped event log shared across trips
pub struct EventLog {
    actions: Mutex<VecDeque<Action>>,
    stops: Mutex<VecDeque<StopEvent>>,
    weight_drops: Mutex<VecDeque<WeightDropEvent>>,
    reports: Mutex<VecDeque<ReportRecord>>,
    retention: RetentionConfig,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, LogError> {
    m.lock().map_err(|e| LogError::Lock(e.to_string()))
}

fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, max: usize) {
    while buf.len() >= max.max(1) {
        buf.pop_front();
    }
    buf.push_back(item);
}

impl EventLog {
    pub fn new(retention: RetentionConfig) -> Self {
        info!("Creating in-memory event log");
        Self {
            actions: Mutex::new(VecDeque::new()),
            stops: Mutex::new(VecDeque::new()),
            weight_drops: Mutex::new(VecDeque::new()),
            reports: Mutex::new(VecDeque::new()),
            retention,
        }
    }

    pub fn insert_action(&self, action: Action) -> Result<(), LogError> {
        let mut actions = lock(&self.actions)?;
        debug!("Logged action {} ({})", action.id, action.kind.as_str());
        push_bounded(&mut actions, action, self.retention.max_actions);
        Ok(())
    }

    pub fn insert_stop(&self, stop: StopEvent) -> Result<(), LogError> {
        let mut stops = lock(&self.stops)?;
        push_bounded(&mut stops, stop, self.retention.max_stops);
        Ok(())
    }

    pub fn insert_weight_drop(&self, event: WeightDropEvent) -> Result<(), LogError> {
        let mut drops = lock(&self.weight_drops)?;
        push_bounded(&mut drops, event, self.retention.max_weight_drops);
        Ok(())
    }

    pub fn insert_report(&self, trip_id: &str, report: Report) -> Result<(), LogError> {
        let mut reports = lock(&self.reports)?;
        push_bounded(
            &mut reports,
            ReportRecord {
                trip_id: trip_id.to_string(),
                report,
            },
            self.retention.max_reports,
        );
        Ok(())
    }

    /// Actions, optionally narrowed to one kind
    pub fn actions(&self, query: &LogQuery, kind: Option<ActionKind>) -> Result<Vec<Action>, LogError> {
        let actions = lock(&self.actions)?;
        Ok(actions
            .iter()
            .rev()
            .filter(|a| query.matches(&a.trip_id))
            .filter(|a| kind.map_or(true, |k| a.kind == k))
            .take(query.limit)
            .cloned()
            .collect())
    }

    pub fn stops(&self, query: &LogQuery) -> Result<Vec<StopEvent>, LogError> {
        let stops = lock(&self.stops)?;
        Ok(stops
            .iter()
            .rev()
            .filter(|s| query.matches(&s.trip_id))
            .take(query.limit)
            .cloned()
            .collect())
    }

    pub fn weight_drops(&self, query: &LogQuery) -> Result<Vec<WeightDropEvent>, LogError> {
        let drops = lock(&self.weight_drops)?;
        Ok(drops
            .iter()
            .rev()
            .filter(|d| query.matches(&d.trip_id))
            .take(query.limit)
            .cloned()
            .collect())
    }

    pub fn reports(&self, query: &LogQuery) -> Result<Vec<ReportRecord>, LogError> {
        let reports = lock(&self.reports)?;
        Ok(reports
            .iter()
            .rev()
            .filter(|r| query.matches(&r.trip_id))
            .take(query.limit)
            .cloned()
            .collect())
    }

    pub fn action_count(&self) -> usize {
        self.actions.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(RetentionConfig::default())
    }
}
