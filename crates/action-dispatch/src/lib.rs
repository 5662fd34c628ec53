//! Action Dispatch
//!
//! Fire-and-forget delivery of issued actions:
//! - `LogSink` writes each action to the tracing log
//! - `MqttSink` publishes JSON envelopes per trip topic
//! - `FanoutSink` hands one action to several sinks
//! - `RecordingSink` keeps delivered actions in memory
//!
//! Sinks never block and never feed back into alert state.

mod mqtt;
mod sink;

pub use mqtt::{MqttConfig, MqttSink};
pub use sink::{ActionSink, FanoutSink, LogSink, RecordingSink};

use chrono::{DateTime, Utc};
use escalation::Action;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Dispatch error types
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Sink {sink} rejected action {action_id}")]
    Rejected { sink: &'static str, action_id: String },

    #[error("{failed} of {total} sinks failed: {first}")]
    Partial {
        failed: usize,
        total: usize,
        first: Box<DispatchError>,
    },
}

/// Wire envelope for a delivered action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMessage {
    pub message_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub action: Action,
}

impl ActionMessage {
    pub fn new(action: Action) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            sent_at: Utc::now(),
            action,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, DispatchError> {
        serde_json::to_vec(self).map_err(|e| DispatchError::Serialization(e.to_string()))
    }
}
