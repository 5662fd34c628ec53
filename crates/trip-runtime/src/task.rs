//! Per-trip task

use crate::command::{Command, TripSnapshot};
use action_dispatch::ActionSink;
use event_log::EventLog;
use std::sync::Arc;
use telemetry::Report;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, error, info, warn};
use trip_monitor::{TripMonitor, TripUpdate};

pub(crate) struct TripTask {
    monitor: TripMonitor,
    rx: mpsc::Receiver<Command>,
    sink: Arc<dyn ActionSink>,
    log: Arc<EventLog>,
    /// Wall instant at which the trip clock last moved, and its value
    anchor: (Instant, u64),
}

impl TripTask {
    pub(crate) fn new(
        monitor: TripMonitor,
        rx: mpsc::Receiver<Command>,
        sink: Arc<dyn ActionSink>,
        log: Arc<EventLog>,
    ) -> Self {
        let clock = monitor.clock_ms();
        Self {
            monitor,
            rx,
            sink,
            log,
            anchor: (Instant::now(), clock),
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Trip {}: task started", self.monitor.trip_id());

        loop {
            let deadline = self.monitor.next_deadline().map(|due| self.wall_time(due));
            let timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(command) => {
                        if self.handle(command) {
                            break;
                        }
                    }
                    None => {
                        self.finish();
                        break;
                    }
                },
                _ = timer => self.fire_due(),
            }
        }

        info!("Trip {}: task stopped", self.monitor.trip_id());
    }

    /// Wall instant at which the trip clock reaches `due_ms`
    fn wall_time(&self, due_ms: u64) -> Instant {
        let (at, clock) = self.anchor;
        at + Duration::from_millis(due_ms.saturating_sub(clock))
    }

    /// Returns true once the trip is finished
    fn handle(&mut self, command: Command) -> bool {
        let update = match command {
            Command::Sample(sample) => {
                metrics::counter!("freightwatch_samples_total").increment(1);
                self.monitor.ingest_sample(&sample)
            }
            Command::Detection(result) => {
                metrics::counter!("freightwatch_detections_total").increment(1);
                self.monitor.ingest_detection(&result)
            }
            Command::Resolve(at_ms) => {
                let now = at_ms.unwrap_or_else(|| self.monitor.clock_ms());
                self.monitor.resolve(now)
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
                return false;
            }
            Command::Finish(reply) => {
                let _ = reply.send(self.finish());
                return true;
            }
        };
        self.publish(&update);
        self.anchor = (Instant::now(), self.monitor.clock_ms());
        false
    }

    fn finish(&mut self) -> TripUpdate {
        let update = self.monitor.finish();
        self.publish(&update);
        update
    }

    fn fire_due(&mut self) {
        let Some(due) = self.monitor.next_deadline() else {
            return;
        };
        debug!("Trip {}: timer fired for {}ms", self.monitor.trip_id(), due);
        let update = self.monitor.advance_to(due);
        self.publish(&update);
        self.anchor = (Instant::now(), self.monitor.clock_ms());
    }

    fn snapshot(&self) -> TripSnapshot {
        TripSnapshot {
            trip_id: self.monitor.trip_id().to_string(),
            alert: self.monitor.alert_state(),
            clock_ms: self.monitor.clock_ms(),
            samples_accepted: self.monitor.samples_accepted(),
            active_stop: self.monitor.active_stop().cloned(),
            weight: self.monitor.weight_summary(),
            history: self.monitor.history().to_vec(),
        }
    }

    /// Record an update and hand its actions to the sink
    fn publish(&self, update: &TripUpdate) {
        let trip_id = self.monitor.trip_id();

        for signal in &update.signals {
            metrics::counter!("freightwatch_signals_total", "kind" => signal.kind().as_str()).increment(1);
        }

        for action in &update.actions {
            metrics::counter!("freightwatch_actions_total", "kind" => action.kind.as_str()).increment(1);
            if let Err(e) = self.log.insert_action(action.clone()) {
                error!("Trip {}: failed to log action {}: {}", trip_id, action.id, e);
            }
            if let Err(e) = self.sink.deliver(action) {
                warn!("Trip {}: delivery of {} via {} failed: {}", trip_id, action.id, self.sink.name(), e);
                metrics::counter!("freightwatch_action_delivery_failures_total").increment(1);
                self.record_report(Report::ActionDeliveryFailed {
                    trip_id: trip_id.to_string(),
                    action_id: action.id.clone(),
                    error: e.to_string(),
                });
            }
        }

        for report in &update.reports {
            warn!("Trip {}: {}", trip_id, report);
            self.record_report(report.clone());
        }

        for stop in &update.stop_events {
            if let Err(e) = self.log.insert_stop(stop.clone()) {
                error!("Trip {}: failed to log stop: {}", trip_id, e);
            }
        }

        for drop in &update.weight_drops {
            if let Err(e) = self.log.insert_weight_drop(drop.clone()) {
                error!("Trip {}: failed to log weight drop: {}", trip_id, e);
            }
        }
    }

    fn record_report(&self, report: Report) {
        metrics::counter!("freightwatch_reports_total", "report" => report.name()).increment(1);
        if let Err(e) = self.log.insert_report(self.monitor.trip_id(), report) {
            error!("Trip {}: failed to log report: {}", self.monitor.trip_id(), e);
        }
    }
}
