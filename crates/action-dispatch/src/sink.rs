//! Action sinks

use crate::DispatchError;
use escalation::Action;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Receiver of issued actions. `deliver` must not block.
pub trait ActionSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn deliver(&self, action: &Action) -> Result<(), DispatchError>;
}

/// Writes actions to the log
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl ActionSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn deliver(&self, action: &Action) -> Result<(), DispatchError> {
        info!(
            trip_id = %action.trip_id,
            action_id = %action.id,
            level = %action.level,
            "{} issued: {}",
            action.kind.as_str(),
            action.reason
        );
        Ok(())
    }
}

/// Keeps every delivered action; can be switched to reject deliveries
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<Action>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every delivery
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    pub fn delivered(&self) -> Vec<Action> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl ActionSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn deliver(&self, action: &Action) -> Result<(), DispatchError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(DispatchError::Rejected {
                sink: self.name(),
                action_id: action.id.clone(),
            });
        }
        self.delivered
            .lock()
            .map_err(|e| DispatchError::Publish(format!("Lock error: {}", e)))?
            .push(action.clone());
        Ok(())
    }
}

/// Delivers to every inner sink; fails if any of them fails
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ActionSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ActionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ActionSink for FanoutSink {
    fn name(&self) -> &'static str {
        "fanout"
    }

    fn deliver(&self, action: &Action) -> Result<(), DispatchError> {
        let mut errors = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(action) {
                warn!("Sink {} failed for action {}: {}", sink.name(), action.id, e);
                errors.push(e);
            }
        }

        let failed = errors.len();
        match errors.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(DispatchError::Partial {
                failed,
                total: self.sinks.len(),
                first: Box::new(first),
            }),
        }
    }
}
