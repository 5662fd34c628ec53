//! Trip supervisor

use crate::command::{CargoRegistration, Command, TripSnapshot};
use crate::task::TripTask;
use crate::RuntimeError;
use action_dispatch::ActionSink;
use detection::{decode_frame, ColorBlobDetector, DetectionResult, PersonDetector, PrecomputedDetector};
use event_log::EventLog;
use geofence::GeofenceIndex;
use route_context::ContextProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use telemetry::{Report, TelemetrySample};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use trip_monitor::{EngineConfig, TripMonitor, TripUpdate};

/// Runtime sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Commands buffered per trip before senders wait
    pub queue_capacity: usize,
    /// Vest-coloured pixels needed for the frame detector to see a person
    pub frame_pixel_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            frame_pixel_threshold: 500,
        }
    }
}

struct TripHandle {
    tx: mpsc::Sender<Command>,
    join: JoinHandle<()>,
}

/// Owns every running trip task
pub struct TripSupervisor {
    engine: EngineConfig,
    runtime: RuntimeConfig,
    geofences: Arc<GeofenceIndex>,
    context: Option<Arc<dyn ContextProvider>>,
    sink: Arc<dyn ActionSink>,
    log: Arc<EventLog>,
    trips: RwLock<HashMap<String, TripHandle>>,
}

impl TripSupervisor {
    pub fn new(
        engine: EngineConfig,
        runtime: RuntimeConfig,
        geofences: Arc<GeofenceIndex>,
        sink: Arc<dyn ActionSink>,
        log: Arc<EventLog>,
    ) -> Result<Self, RuntimeError> {
        engine.validate()?;
        info!(
            "Trip supervisor ready: {} geofence(s), sink {}",
            geofences.len(),
            sink.name()
        );
        Ok(Self {
            engine,
            runtime,
            geofences,
            context: None,
            sink,
            log,
            trips: RwLock::new(HashMap::new()),
        })
    }

    /// Route context attached to every trip started afterwards
    pub fn with_context(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context = Some(provider);
        self
    }

    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    pub async fn trip_count(&self) -> usize {
        self.trips.read().await.len()
    }

    pub async fn trip_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.trips.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Start a trip explicitly, optionally with its declared cargo
    pub async fn start_trip(&self, trip_id: &str, cargo: Option<CargoRegistration>) -> Result<(), RuntimeError> {
        let mut trips = self.trips.write().await;
        if trips.contains_key(trip_id) {
            return Err(RuntimeError::TripAlreadyRunning(trip_id.to_string()));
        }
        let handle = self.spawn(trip_id, cargo);
        trips.insert(trip_id.to_string(), handle);
        metrics::gauge!("freightwatch_live_trips").set(trips.len() as f64);
        Ok(())
    }

    /// Feed a sample; the first sample of an unseen trip starts it
    pub async fn ingest_sample(&self, trip_id: &str, sample: TelemetrySample) -> Result<(), RuntimeError> {
        let tx = match self.sender(trip_id).await {
            Some(tx) => tx,
            None => {
                let mut trips = self.trips.write().await;
                let tx = trips
                    .entry(trip_id.to_string())
                    .or_insert_with(|| self.spawn(trip_id, None))
                    .tx
                    .clone();
                metrics::gauge!("freightwatch_live_trips").set(trips.len() as f64);
                tx
            }
        };
        self.send(trip_id, &tx, Command::Sample(sample)).await
    }

    pub async fn ingest_detection(&self, trip_id: &str, result: DetectionResult) -> Result<(), RuntimeError> {
        let tx = self.known_sender(trip_id).await?;
        let result = PrecomputedDetector.detect(&result, result.timestamp_ms)?;
        self.send(trip_id, &tx, Command::Detection(result)).await
    }

    /// Run the frame detector over an encoded camera frame and feed its
    /// result to the trip. Undecodable frames are reported and rejected.
    pub async fn ingest_frame(
        &self,
        trip_id: &str,
        frame: Vec<u8>,
        timestamp_ms: u64,
    ) -> Result<DetectionResult, RuntimeError> {
        let tx = self.known_sender(trip_id).await?;
        let threshold = self.runtime.frame_pixel_threshold;

        let detected = tokio::task::spawn_blocking(move || {
            let image = decode_frame(&frame)?;
            ColorBlobDetector::new(threshold).detect(&image, timestamp_ms)
        })
        .await
        .map_err(|e| RuntimeError::Detector(e.to_string()))?;

        let result = match detected {
            Ok(result) => result,
            Err(e) => {
                let report = e.to_report(timestamp_ms);
                warn!("Trip {}: {}", trip_id, report);
                metrics::counter!("freightwatch_reports_total", "report" => report.name()).increment(1);
                if let Err(log_err) = self.log.insert_report(trip_id, report) {
                    warn!("Failed to log report: {}", log_err);
                }
                return Err(RuntimeError::Frame(e));
            }
        };

        self.send(trip_id, &tx, Command::Detection(result.clone())).await?;
        Ok(result)
    }

    /// Operator resolution at `at_ms`, or at the trip's current clock
    pub async fn resolve(&self, trip_id: &str, at_ms: Option<u64>) -> Result<(), RuntimeError> {
        let tx = self.known_sender(trip_id).await?;
        self.send(trip_id, &tx, Command::Resolve(at_ms)).await
    }

    pub async fn snapshot(&self, trip_id: &str) -> Result<TripSnapshot, RuntimeError> {
        let tx = self
            .sender(trip_id)
            .await
            .ok_or_else(|| RuntimeError::UnknownTrip(trip_id.to_string()))?;
        let (reply, rx) = oneshot::channel();
        self.send(trip_id, &tx, Command::Snapshot(reply)).await?;
        rx.await.map_err(|_| RuntimeError::TripStopped(trip_id.to_string()))
    }

    /// Snapshots of every running trip, ordered by trip id
    pub async fn snapshots(&self) -> Vec<TripSnapshot> {
        let mut snapshots = Vec::new();
        for trip_id in self.trip_ids().await {
            match self.snapshot(&trip_id).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("Trip {}: snapshot failed: {}", trip_id, e),
            }
        }
        snapshots
    }

    /// End a trip's stream and wait for its task to stop
    pub async fn finish_trip(&self, trip_id: &str) -> Result<TripUpdate, RuntimeError> {
        let handle = {
            let mut trips = self.trips.write().await;
            let handle = trips.remove(trip_id);
            metrics::gauge!("freightwatch_live_trips").set(trips.len() as f64);
            handle
        };
        let handle = handle.ok_or_else(|| self.unknown(trip_id))?;

        let (reply, rx) = oneshot::channel();
        self.send(trip_id, &handle.tx, Command::Finish(reply)).await?;
        let update = rx.await.map_err(|_| RuntimeError::TripStopped(trip_id.to_string()))?;
        if let Err(e) = handle.join.await {
            warn!("Trip {}: task ended abnormally: {}", trip_id, e);
        }
        Ok(update)
    }

    /// Finish every running trip
    pub async fn shutdown(&self) {
        for trip_id in self.trip_ids().await {
            if let Err(e) = self.finish_trip(&trip_id).await {
                warn!("Trip {}: shutdown failed: {}", trip_id, e);
            }
        }
        info!("Trip supervisor stopped");
    }

    fn spawn(&self, trip_id: &str, cargo: Option<CargoRegistration>) -> TripHandle {
        let mut monitor = TripMonitor::new(trip_id, &self.engine, Arc::clone(&self.geofences));
        if let Some(provider) = &self.context {
            monitor = monitor.with_context(Arc::clone(provider));
        }
        if let Some(cargo) = cargo {
            monitor.register_weight(cargo.total_weight_kg, cargo.packaging_weight_kg, cargo.at_ms);
        }

        let (tx, rx) = mpsc::channel(self.runtime.queue_capacity.max(1));
        let task = TripTask::new(monitor, rx, Arc::clone(&self.sink), Arc::clone(&self.log));
        let join = tokio::spawn(task.run());
        info!("Trip {}: started", trip_id);
        TripHandle { tx, join }
    }

    async fn sender(&self, trip_id: &str) -> Option<mpsc::Sender<Command>> {
        self.trips.read().await.get(trip_id).map(|h| h.tx.clone())
    }

    async fn known_sender(&self, trip_id: &str) -> Result<mpsc::Sender<Command>, RuntimeError> {
        match self.sender(trip_id).await {
            Some(tx) => Ok(tx),
            None => Err(self.unknown(trip_id)),
        }
    }

    async fn send(&self, trip_id: &str, tx: &mpsc::Sender<Command>, command: Command) -> Result<(), RuntimeError> {
        tx.send(command)
            .await
            .map_err(|_| RuntimeError::TripStopped(trip_id.to_string()))
    }

    /// Report a command for a trip that is not running
    fn unknown(&self, trip_id: &str) -> RuntimeError {
        let report = Report::UnknownTrip {
            trip_id: trip_id.to_string(),
        };
        warn!("{}", report);
        metrics::counter!("freightwatch_reports_total", "report" => report.name()).increment(1);
        if let Err(e) = self.log.insert_report(trip_id, report) {
            warn!("Failed to log report: {}", e);
        }
        RuntimeError::UnknownTrip(trip_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_dispatch::RecordingSink;
    use escalation::{ActionKind, AlertLevel};
    use event_log::LogQuery;
    use telemetry::GeoPoint;
    use tokio::time::{sleep, Duration};

    const HIGHWAY: GeoPoint = GeoPoint { lat: 22.35, lon: 87.60 };

    fn supervisor(sink: &RecordingSink) -> TripSupervisor {
        TripSupervisor::new(
            EngineConfig::default(),
            RuntimeConfig::default(),
            Arc::new(GeofenceIndex::empty()),
            Arc::new(sink.clone()),
            Arc::new(EventLog::default()),
        )
        .unwrap()
    }

    async fn drive(sup: &TripSupervisor, trip: &str, from_s: u64, to_s: u64, speed: f64) {
        for t in (from_s..=to_s).step_by(10) {
            let sample = TelemetrySample::new(t * 1000, HIGHWAY, speed, 10_000.0);
            sup.ingest_sample(trip, sample).await.unwrap();
        }
    }

    /// Moving until 50 s, stopped from 60 s; suspicious at 660 s
    async fn unauthorized_stop(sup: &TripSupervisor, trip: &str) {
        drive(sup, trip, 0, 50, 40.0).await;
        drive(sup, trip, 60, 800, 0.0).await;
    }

    fn kinds(sink: &RecordingSink) -> Vec<ActionKind> {
        sink.delivered().into_iter().map(|a| a.kind).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_without_further_samples() {
        let sink = RecordingSink::new();
        let sup = supervisor(&sink);
        unauthorized_stop(&sup, "T1").await;

        let snap = sup.snapshot("T1").await.unwrap();
        assert_eq!(snap.alert.level, AlertLevel::Watchlist);
        assert_eq!(snap.alert.next_timeout_ms, Some(960_000));
        assert_eq!(kinds(&sink), vec![ActionKind::Log]);

        // 160 s of trip time remain until the L1 timeout
        sleep(Duration::from_secs(150)).await;
        assert_eq!(sup.snapshot("T1").await.unwrap().alert.level, AlertLevel::Watchlist);

        sleep(Duration::from_secs(20)).await;
        let snap = sup.snapshot("T1").await.unwrap();
        assert_eq!(snap.alert.level, AlertLevel::Warning);
        assert_eq!(snap.clock_ms, 960_000);
        assert_eq!(kinds(&sink), vec![ActionKind::Log, ActionKind::Sms]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_rearms_timer() {
        let sink = RecordingSink::new();
        let sup = supervisor(&sink);
        unauthorized_stop(&sup, "T1").await;

        sleep(Duration::from_secs(100)).await;
        sup.resolve("T1", None).await.unwrap();

        sleep(Duration::from_secs(600)).await;
        let snap = sup.snapshot("T1").await.unwrap();
        assert_eq!(snap.alert.level, AlertLevel::None);
        assert_eq!(snap.alert.next_timeout_ms, None);
        assert_eq!(kinds(&sink), vec![ActionKind::Log, ActionKind::Log]);
        assert!(sink.delivered()[1].is_resolution());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_trip_is_reported() {
        let sink = RecordingSink::new();
        let sup = supervisor(&sink);

        let err = sup.resolve("ghost", None).await.unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownTrip(ref id) if id == "ghost"));

        let reports = sup.log().reports(&LogQuery::trip("ghost")).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].report.name(), "unknown_trip");
        assert_eq!(sup.trip_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_failure_leaves_state_alone() {
        let sink = RecordingSink::failing();
        let sup = supervisor(&sink);
        unauthorized_stop(&sup, "T1").await;

        let snap = sup.snapshot("T1").await.unwrap();
        assert_eq!(snap.alert.level, AlertLevel::Watchlist);

        let log = sup.log();
        assert_eq!(log.actions(&LogQuery::trip("T1"), None).unwrap().len(), 1);
        let failures: Vec<_> = log
            .reports(&LogQuery::trip("T1"))
            .unwrap()
            .into_iter()
            .filter(|r| r.report.name() == "action_delivery_failed")
            .collect();
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_run_independently() {
        let sink = RecordingSink::new();
        let sup = supervisor(&sink);
        unauthorized_stop(&sup, "A").await;
        drive(&sup, "B", 0, 800, 60.0).await;

        assert_eq!(sup.trip_ids().await, vec!["A", "B"]);
        let snaps = sup.snapshots().await;
        assert_eq!(snaps[0].alert.level, AlertLevel::Watchlist);
        assert_eq!(snaps[1].alert.level, AlertLevel::None);
        assert!(sink.delivered().iter().all(|a| a.trip_id == "A"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_finalizes_ongoing_stop() {
        let sink = RecordingSink::new();
        let sup = supervisor(&sink);
        unauthorized_stop(&sup, "T1").await;

        let update = sup.finish_trip("T1").await.unwrap();
        assert_eq!(update.stop_events.len(), 1);
        assert!(update.stop_events[0].ongoing);
        assert_eq!(sup.trip_count().await, 0);
        assert_eq!(sup.log().stops(&LogQuery::trip("T1")).unwrap().len(), 1);
        assert!(matches!(sup.snapshot("T1").await, Err(RuntimeError::UnknownTrip(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_trip_twice_rejected() {
        let sink = RecordingSink::new();
        let sup = supervisor(&sink);
        let cargo = CargoRegistration {
            total_weight_kg: 10_000.0,
            packaging_weight_kg: 50.0,
            at_ms: 0,
        };
        sup.start_trip("T1", Some(cargo)).await.unwrap();
        assert!(matches!(
            sup.start_trip("T1", None).await,
            Err(RuntimeError::TripAlreadyRunning(_))
        ));

        drive(&sup, "T1", 0, 20, 40.0).await;
        let weight = sup.snapshot("T1").await.unwrap().weight.unwrap();
        assert_eq!(weight.initial_weight_kg, 10_000.0);
        sup.shutdown().await;
        assert_eq!(sup.trip_count().await, 0);
    }

    fn vest_frame() -> Vec<u8> {
        let mut frame = image::RgbImage::from_pixel(200, 200, image::Rgb([120, 120, 120]));
        for x in 30..60 {
            for y in 50..130 {
                frame.put_pixel(x, y, image::Rgb([231, 76, 60]));
            }
        }
        let mut png = Vec::new();
        frame
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    #[tokio::test]
    async fn test_frame_detection_escalates() {
        let sink = RecordingSink::new();
        let sup = supervisor(&sink);
        unauthorized_stop(&sup, "T1").await;

        let result = sup.ingest_frame("T1", vest_frame(), 800_000).await.unwrap();
        assert!(result.person_present);
        assert_eq!(result.bounding_boxes.len(), 1);

        let snap = sup.snapshot("T1").await.unwrap();
        assert_eq!(snap.alert.level, AlertLevel::Emergency);
        assert_eq!(
            kinds(&sink),
            vec![
                ActionKind::Log,
                ActionKind::Sms,
                ActionKind::CallAndCameraOn,
                ActionKind::Dispatch
            ]
        );
    }

    #[tokio::test]
    async fn test_undecodable_frame_reported() {
        let sink = RecordingSink::new();
        let sup = supervisor(&sink);
        drive(&sup, "T1", 0, 20, 40.0).await;

        let err = sup.ingest_frame("T1", b"garbage".to_vec(), 25_000).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Frame(_)));
        let reports = sup.log().reports(&LogQuery::trip("T1")).unwrap();
        assert_eq!(reports[0].report.name(), "detection_rejected");

        assert!(matches!(
            sup.ingest_frame("ghost", vest_frame(), 0).await,
            Err(RuntimeError::UnknownTrip(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let engine = EngineConfig {
            l1_timeout_s: 0,
            ..Default::default()
        };
        let result = TripSupervisor::new(
            engine,
            RuntimeConfig::default(),
            Arc::new(GeofenceIndex::empty()),
            Arc::new(RecordingSink::new()),
            Arc::new(EventLog::default()),
        );
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }
}
