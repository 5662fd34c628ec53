//! FreightWatch API Server
//!
//! REST interface over the trip runtime: telemetry and detection intake,
//! operator resolution, alert queries, event log queries, and Prometheus
//! metrics.

use action_dispatch::{ActionSink, FanoutSink, LogSink, MqttConfig, MqttSink};
use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use event_log::EventLog;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use trip_runtime::TripSupervisor;

pub mod config;
pub mod error;
pub mod rate_limit;
mod routes;

pub use config::{AppConfig, LogConfig};
pub use error::ApiError;
pub use rate_limit::RateLimitConfig;

/// Application state shared across handlers
pub struct AppState {
    pub supervisor: Arc<TripSupervisor>,
    /// Zones loaded at startup
    pub geofence_count: usize,
    pub version: String,
    pub start_time: std::time::Instant,
    /// Present once the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(supervisor: Arc<TripSupervisor>, geofence_count: usize, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            supervisor,
            geofence_count,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics,
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub live_trips: usize,
    pub geofences: usize,
    pub actions_logged: usize,
    pub reports_logged: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, rate_limit: &RateLimitConfig) -> Router {
    let commands: Router<Arc<AppState>> = Router::new()
        .route(
            "/api/v1/trips/:trip_id",
            post(routes::trips::start_trip).delete(routes::trips::finish_trip),
        )
        .route("/api/v1/trips/:trip_id/telemetry", post(routes::trips::post_telemetry))
        .route("/api/v1/trips/:trip_id/detections", post(routes::trips::post_detection))
        .route("/api/v1/trips/:trip_id/frames", post(routes::trips::post_frame))
        .route("/api/v1/trips/:trip_id/resolve", post(routes::trips::post_resolve));

    let commands = match rate_limit::create_governor_config(rate_limit) {
        Some(config) => commands.layer(GovernorLayer { config }),
        None => commands,
    };

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/trips", get(routes::alerts::list_trips))
        .route("/api/v1/trips/:trip_id/alert", get(routes::alerts::get_trip_alert))
        .route("/api/v1/alerts/summary", get(routes::alerts::get_summary))
        .route("/api/v1/actions", get(routes::events::get_actions))
        .route("/api/v1/stops", get(routes::events::get_stops))
        .route("/api/v1/weight-drops", get(routes::events::get_weight_drops))
        .route("/api/v1/reports", get(routes::events::get_reports))
        .route("/metrics", get(metrics_handler))
        .merge(commands)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let log = state.supervisor.log();
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        live_trips: state.supervisor.trip_count().await,
        geofences: state.geofence_count,
        actions_logged: log.action_count(),
        reports_logged: log.report_count(),
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(config: &LogConfig) {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Log sink, plus MQTT when enabled
fn build_sink(mqtt: &MqttConfig) -> anyhow::Result<Arc<dyn ActionSink>> {
    let mut fanout = FanoutSink::new().with(Arc::new(LogSink));
    if mqtt.enabled {
        let sink = MqttSink::connect(mqtt.clone()).context("connecting MQTT action sink")?;
        fanout = fanout.with(Arc::new(sink));
    }
    Ok(Arc::new(fanout))
}

/// Run the server until Ctrl-C, then finish every trip
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let geofences = Arc::new(config.geofence_index().context("invalid geofence configuration")?);
    let geofence_count = geofences.len();
    let sink = build_sink(&config.mqtt)?;
    let log = Arc::new(EventLog::default());

    let mut supervisor = TripSupervisor::new(config.engine.clone(), config.runtime.clone(), geofences, sink, log)?;
    if let Some(hotspots) = config.hotspot_map() {
        info!("Route context enabled with {} hotspot(s)", config.hotspots.len());
        supervisor = supervisor.with_context(Arc::new(hotspots));
    }

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    };

    let state = Arc::new(AppState::new(Arc::new(supervisor), geofence_count, metrics));
    let app = create_router(Arc::clone(&state), &config.rate_limit);

    let addr = config.server.addr();
    info!("Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.supervisor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
