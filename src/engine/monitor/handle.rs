use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::engine::errors::MonitorError;
use crate::engine::telemetry::{
    SubscriptionId, TelemetryBus, TelemetryEvent, TelemetryHandler, event_names,
};
use crate::shared::config::{AlertThresholds, MonitorConfig};

use super::aggregate::CurrentMetrics;
use super::alerts::{Alert, HealthStatus};
use super::message::MonitorMessage;
use super::metric::{ErrorMetric, PipelineMetric, QueryMetric};
use super::summary::{DataPoint, PerformanceSummary};
use super::window::TimeWindow;
use super::worker::{MonitorState, run_worker_loop};

const LOG_TARGET: &str = "engine::monitor::handle";

#[derive(Default)]
struct Shared {
    dropped: AtomicU64,
    subscriptions: Mutex<Vec<(TelemetryBus, SubscriptionId)>>,
}

/// Cloneable handle to the monitor worker.
///
/// Recording is fire-and-forget and never blocks. The worker queue is
/// unbounded so a burst of records is queued, not lost; only records sent
/// after the worker stopped are dropped and counted (see [`dropped_events`]).
/// Reads share the same queue and so observe every earlier record.
///
/// [`dropped_events`]: PerformanceMonitor::dropped_events
#[derive(Clone)]
pub struct PerformanceMonitor {
    tx: UnboundedSender<MonitorMessage>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("closed", &self.tx.is_closed())
            .field("dropped", &self.dropped_events())
            .finish()
    }
}

impl PerformanceMonitor {
    /// Spawns the owning worker on the current tokio runtime.
    pub fn spawn(config: MonitorConfig) -> Self {
        let (tx, rx) = unbounded_channel();
        let state = MonitorState::new(&config);
        tokio::spawn(run_worker_loop(state, rx));
        info!(target: LOG_TARGET, "Monitor spawned");
        Self {
            tx,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Subscribes to every loader event on `bus` and turns each into the
    /// matching `record_*` call. Start events carry nothing to record; their
    /// stop counterparts do. Handlers are removed again by [`shutdown`].
    ///
    /// A bus attached here should not also be attached to a cache that the
    /// executor uses for result caching, or lookups are counted twice.
    ///
    /// [`shutdown`]: PerformanceMonitor::shutdown
    pub fn attach(&self, bus: &TelemetryBus) -> SubscriptionId {
        let monitor = self.clone();
        let handler: TelemetryHandler = Arc::new(move |event| monitor.on_event(event));
        let id = bus.subscribe(event_names::ALL, handler);
        self.shared.subscriptions.lock().push((bus.clone(), id));
        debug!(target: LOG_TARGET, "Telemetry handlers attached");
        id
    }

    pub fn record_query_execution(&self, metric: QueryMetric) {
        self.record(MonitorMessage::RecordQuery(metric));
    }

    pub fn record_pipeline_processing(&self, metric: PipelineMetric) {
        self.record(MonitorMessage::RecordPipeline(metric));
    }

    pub fn record_error(&self, error_type: impl Into<String>, context: Map<String, Value>) {
        self.record(MonitorMessage::RecordError(ErrorMetric::new(error_type, context)));
    }

    /// For errors carrying an explicit timestamp.
    pub fn record_error_metric(&self, metric: ErrorMetric) {
        self.record(MonitorMessage::RecordError(metric));
    }

    pub fn record_cache_access(&self, hit: bool) {
        self.record(MonitorMessage::RecordCacheAccess { hit });
    }

    pub async fn get_current_metrics(&self) -> Result<CurrentMetrics, MonitorError> {
        self.request(|reply| MonitorMessage::CurrentMetrics { reply })
            .await
    }

    pub async fn get_performance_summary(
        &self,
        window: TimeWindow,
    ) -> Result<PerformanceSummary, MonitorError> {
        self.request(|reply| MonitorMessage::Summary { window, reply })
            .await
    }

    /// `(timestamp, value)` points for `query_duration` (ms) or
    /// `memory_usage` (MB). Any other name yields an empty series.
    pub async fn get_historical_metrics(
        &self,
        window: TimeWindow,
        metric: &str,
    ) -> Result<Vec<DataPoint>, MonitorError> {
        self.request(|reply| MonitorMessage::Historical {
            window,
            metric: metric.to_string(),
            reply,
        })
        .await
    }

    pub async fn check_alerts(&self) -> Result<Vec<Alert>, MonitorError> {
        self.request(|reply| MonitorMessage::CheckAlerts { reply })
            .await
    }

    pub async fn get_health_status(&self) -> Result<HealthStatus, MonitorError> {
        self.request(|reply| MonitorMessage::Health { reply }).await
    }

    pub async fn reset_metrics(&self) -> Result<(), MonitorError> {
        self.request(|reply| MonitorMessage::Reset { reply }).await
    }

    pub async fn set_thresholds(&self, thresholds: AlertThresholds) -> Result<(), MonitorError> {
        self.tx
            .send(MonitorMessage::SetThresholds(thresholds))
            .map_err(|_| MonitorError::Unavailable)
    }

    /// Records sent after the worker had already stopped.
    pub fn dropped_events(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Detaches every telemetry handler registered through this monitor and
    /// stops the worker.
    pub async fn shutdown(&self) {
        let subscriptions: Vec<_> = self.shared.subscriptions.lock().drain(..).collect();
        for (bus, id) in subscriptions {
            bus.unsubscribe(id);
        }
        if self.request(|reply| MonitorMessage::Shutdown { reply }).await.is_err() {
            debug!(target: LOG_TARGET, "Monitor already stopped");
        }
    }

    fn on_event(&self, event: &TelemetryEvent) {
        match event.name.as_str() {
            event_names::QUERY_STOP => {
                let duration = duration_from_ms(event.measurement_f64("duration_ms"));
                let records = event.measurement_u64("record_count").unwrap_or(0) as usize;
                let mut metric = QueryMetric::new(duration, records).at(event.at);
                metric.cache_hit = event.meta_bool("cache_hit");
                metric.resource = event.meta_str("resource").map(str::to_string);
                self.record_query_execution(metric);
            }
            event_names::CACHE_HIT => self.record_cache_access(true),
            event_names::CACHE_MISS => self.record_cache_access(false),
            event_names::PIPELINE_STOP => {
                let mut metric = PipelineMetric::new(
                    duration_from_ms(event.measurement_f64("duration_ms")),
                    event.measurement_u64("records_processed").unwrap_or(0),
                    event.measurement_u64("memory_usage").unwrap_or(0),
                )
                .at(event.at);
                metric.report = event.meta_str("report").map(str::to_string);
                self.record_pipeline_processing(metric);
            }
            event_names::ERROR => {
                let error_type = event.meta_str("error_type").unwrap_or("unknown").to_string();
                self.record_error_metric(
                    ErrorMetric::new(error_type, event.metadata.clone()).at(event.at),
                );
            }
            _ => {}
        }
    }

    fn record(&self, msg: MonitorMessage) {
        if self.tx.send(msg).is_err() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(target: LOG_TARGET, "Monitor worker is gone; dropping event");
        }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> MonitorMessage,
    ) -> Result<R, MonitorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .map_err(|_| MonitorError::Unavailable)?;
        reply_rx.await.map_err(|_| MonitorError::Unavailable)
    }
}

fn duration_from_ms(ms: Option<f64>) -> Duration {
    ms.filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| Duration::from_secs_f64(v / 1000.0))
        .unwrap_or_default()
}
