//! Event log queries

use axum::{
    extract::{Query, State},
    Json,
};
use escalation::{Action, ActionKind};
use event_log::{LogQuery, ReportRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stop_analyzer::StopEvent;
use weight_analyzer::WeightDropEvent;

use crate::error::ApiError;
use crate::AppState;

/// Query parameters for the actions endpoint
#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub trip_id: Option<String>,
    pub kind: Option<ActionKind>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// List response
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

/// Issued actions, newest first
pub async fn get_actions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActionQuery>,
) -> Result<Json<ListResponse<Action>>, ApiError> {
    let query = LogQuery {
        trip_id: params.trip_id,
        limit: params.limit,
    };
    let actions = state.supervisor.log().actions(&query, params.kind)?;
    Ok(Json(actions.into()))
}

/// Finalized stops, newest first
pub async fn get_stops(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<ListResponse<StopEvent>>, ApiError> {
    Ok(Json(state.supervisor.log().stops(&query)?.into()))
}

pub async fn get_weight_drops(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<ListResponse<WeightDropEvent>>, ApiError> {
    Ok(Json(state.supervisor.log().weight_drops(&query)?.into()))
}

/// Diagnostic reports, newest first
pub async fn get_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<ListResponse<ReportRecord>>, ApiError> {
    Ok(Json(state.supervisor.log().reports(&query)?.into()))
}
