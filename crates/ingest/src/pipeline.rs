use serde::Serialize;

use crate::error_log::ErrorLog;
use crate::events::LifecycleEvent;
use crate::health::{HealthState, Notification, WriteHealth};
use crate::session::{EventOutcome, SessionTracker};
use crate::sink::UsageSink;

/// Counters kept across the life of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub events: usize,
    pub records_sent: usize,
    pub records_failed: usize,
    pub ignored: usize,
    pub notifications: usize,
}

/// Drives lifecycle events through extraction and into a sink.
///
/// Sink failures never propagate: they are logged, flip the write health to
/// failing, and surface as a [`Notification`] on the next checkpoint.
pub struct EventPipeline<S> {
    tracker: SessionTracker,
    sink: S,
    health: WriteHealth,
    log: Option<ErrorLog>,
    stats: PipelineStats,
}

impl<S: UsageSink> EventPipeline<S> {
    pub fn new(tracker: SessionTracker, sink: S) -> Self {
        Self {
            tracker,
            sink,
            health: WriteHealth::default(),
            log: None,
            stats: PipelineStats::default(),
        }
    }

    pub fn with_error_log(mut self, log: ErrorLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn health(&self) -> HealthState {
        self.health.state()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Checks the sink once before events arrive.
    pub async fn startup_probe(&mut self) -> bool {
        match self.sink.probe().await {
            Ok(()) => {
                self.health.record_success();
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "usage sink unavailable on startup");
                self.log_error("[TokenTracker] Store connection failed on startup", &err);
                self.health.record_failure();
                false
            }
        }
    }

    /// Handles one event; returns a warning when one is due.
    pub async fn handle(&mut self, event: &LifecycleEvent) -> Option<Notification> {
        self.stats.events += 1;
        match self.tracker.handle(event) {
            EventOutcome::Record(record) => {
                match self.sink.track(&record).await {
                    Ok(()) => {
                        self.stats.records_sent += 1;
                        self.health.record_success();
                    }
                    Err(err) => {
                        self.stats.records_failed += 1;
                        tracing::warn!(error = %err, model = %record.model, "usage record dropped");
                        self.log_error("[TokenTracker] Track error:", &err);
                        self.health.record_failure();
                    }
                }
                None
            }
            EventOutcome::Checkpoint => {
                let notification = self.health.take_notification();
                if notification.is_some() {
                    self.stats.notifications += 1;
                }
                notification
            }
            EventOutcome::Ignored => {
                self.stats.ignored += 1;
                None
            }
            EventOutcome::Accumulated { .. } => None,
        }
    }

    fn log_error(&self, message: &str, err: &dyn std::fmt::Display) {
        if let Some(log) = &self.log {
            log.append(message, Some(err));
        }
    }
}
