//! Trip command routes

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use detection::DetectionResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telemetry::TelemetrySample;
use trip_monitor::TripUpdate;
use trip_runtime::CargoRegistration;

use crate::error::ApiError;
use crate::AppState;

/// One sample or a batch, in stream order
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SampleBatch {
    One(TelemetrySample),
    Many(Vec<TelemetrySample>),
}

impl SampleBatch {
    fn into_vec(self) -> Vec<TelemetrySample> {
        match self {
            SampleBatch::One(sample) => vec![sample],
            SampleBatch::Many(samples) => samples,
        }
    }
}

/// Body for starting a trip
#[derive(Debug, Default, Deserialize)]
pub struct StartTripRequest {
    pub cargo: Option<CargoRegistration>,
}

/// Query parameters for resolve
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    /// Resolution time on the trip clock; defaults to the latest sample time
    pub at_ms: Option<u64>,
}

/// Query parameters for a camera frame
#[derive(Debug, Deserialize)]
pub struct FrameQuery {
    /// Capture time on the trip clock
    pub timestamp_ms: u64,
}

/// Command queued for a trip
#[derive(Debug, Serialize)]
pub struct CommandAccepted {
    pub trip_id: String,
    pub queued: usize,
}

fn accepted(trip_id: String, queued: usize) -> (StatusCode, Json<CommandAccepted>) {
    (StatusCode::ACCEPTED, Json(CommandAccepted { trip_id, queued }))
}

/// Start a trip with its declared cargo
pub async fn start_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(request): Json<StartTripRequest>,
) -> Result<(StatusCode, Json<CommandAccepted>), ApiError> {
    if let Some(cargo) = &request.cargo {
        if !(cargo.total_weight_kg > 0.0 && cargo.packaging_weight_kg >= 0.0) {
            return Err(ApiError::BadRequest("cargo weights must be positive".into()));
        }
    }
    state.supervisor.start_trip(&trip_id, request.cargo).await?;
    Ok((StatusCode::CREATED, Json(CommandAccepted { trip_id, queued: 0 })))
}

/// End a trip's stream
pub async fn finish_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripUpdate>, ApiError> {
    Ok(Json(state.supervisor.finish_trip(&trip_id).await?))
}

pub async fn post_telemetry(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(batch): Json<SampleBatch>,
) -> Result<(StatusCode, Json<CommandAccepted>), ApiError> {
    let samples = batch.into_vec();
    let queued = samples.len();
    for sample in samples {
        state.supervisor.ingest_sample(&trip_id, sample).await?;
    }
    Ok(accepted(trip_id, queued))
}

pub async fn post_detection(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Json(result): Json<DetectionResult>,
) -> Result<(StatusCode, Json<CommandAccepted>), ApiError> {
    state.supervisor.ingest_detection(&trip_id, result).await?;
    Ok(accepted(trip_id, 1))
}

/// Encoded camera frame; the detector result is returned and forwarded
pub async fn post_frame(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Query(query): Query<FrameQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<DetectionResult>), ApiError> {
    let result = state
        .supervisor
        .ingest_frame(&trip_id, body.to_vec(), query.timestamp_ms)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(result)))
}

/// Operator resolution
pub async fn post_resolve(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<(StatusCode, Json<CommandAccepted>), ApiError> {
    state.supervisor.resolve(&trip_id, query.at_ms).await?;
    Ok(accepted(trip_id, 1))
}
