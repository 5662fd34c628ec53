//! Alert Routes

use axum::{
    extract::{Path, State},
    Json,
};
use escalation::AlertSummary;
use std::sync::Arc;
use trip_runtime::TripSnapshot;

use crate::error::ApiError;
use crate::AppState;

/// Alert state, active stop, and weight status of one trip
pub async fn get_trip_alert(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripSnapshot>, ApiError> {
    Ok(Json(state.supervisor.snapshot(&trip_id).await?))
}

pub async fn list_trips(State(state): State<Arc<AppState>>) -> Json<Vec<TripSnapshot>> {
    Json(state.supervisor.snapshots().await)
}

/// Count of running trips per alert level
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<AlertSummary> {
    let snapshots = state.supervisor.snapshots().await;
    Json(snapshots.iter().map(|s| &s.alert).collect())
}
