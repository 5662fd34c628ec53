//! Event Log
//!
//! Bounded in-memory record of what the engine issued and observed during
//! this run. Nothing is persisted.

mod log;

pub use log::{EventLog, LogQuery, ReportRecord, RetentionConfig};

use thiserror::Error;

/// Event log errors
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Lock error: {0}")]
    Lock(String),
}
