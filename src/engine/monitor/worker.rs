use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::shared::config::{AlertThresholds, MonitorConfig};
use crate::shared::time::{as_millis_f64, now_utc, utc_minus};

use super::aggregate::{CurrentMetrics, LiveTotals};
use super::alerts::{Alert, HealthStatus, evaluate};
use super::history::MetricHistory;
use super::message::MonitorMessage;
use super::metric::{ErrorMetric, PipelineMetric, QueryMetric};
use super::probe::ProcessProbe;
use super::summary::{DataPoint, PerformanceSummary, extract_series};
use super::window::TimeWindow;

const LOG_TARGET: &str = "engine::monitor::worker";

const PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Single owner of the live totals and the three histories.
#[derive(Debug)]
pub struct MonitorState {
    thresholds: AlertThresholds,
    retention: Duration,
    started: Instant,
    counting_since: Instant,
    totals: LiveTotals,
    queries: MetricHistory<QueryMetric>,
    pipelines: MetricHistory<PipelineMetric>,
    errors: MetricHistory<ErrorMetric>,
    probe: ProcessProbe,
}

impl MonitorState {
    pub fn new(config: &MonitorConfig) -> Self {
        let now = Instant::now();
        Self {
            thresholds: config.thresholds.clone(),
            retention: config.history_retention(),
            started: now,
            counting_since: now,
            totals: LiveTotals::default(),
            queries: MetricHistory::new(),
            pipelines: MetricHistory::new(),
            errors: MetricHistory::new(),
            probe: ProcessProbe::new(PROBE_INTERVAL),
        }
    }

    fn horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        utc_minus(now, self.retention)
    }

    pub fn record_query(&mut self, mut metric: QueryMetric, now: DateTime<Utc>) {
        self.totals.apply_query(&metric);
        if metric.memory_usage.is_none() {
            metric.memory_usage = Some(self.probe.sample(Instant::now()).memory_bytes);
        }
        let at = *metric.timestamp.get_or_insert(now);
        let horizon = self.horizon(now);
        self.queries.record(at, metric, horizon);
    }

    pub fn record_pipeline(&mut self, mut metric: PipelineMetric, now: DateTime<Utc>) {
        self.totals.apply_pipeline(&metric);
        let at = *metric.timestamp.get_or_insert(now);
        let horizon = self.horizon(now);
        self.pipelines.record(at, metric, horizon);
    }

    pub fn record_error(&mut self, mut metric: ErrorMetric, now: DateTime<Utc>) {
        self.totals.apply_error();
        let at = *metric.timestamp.get_or_insert(now);
        let horizon = self.horizon(now);
        self.errors.record(at, metric, horizon);
    }

    pub fn record_cache_access(&mut self, hit: bool) {
        self.totals.apply_cache_access(hit);
    }

    pub fn current_metrics(&mut self, now: DateTime<Utc>) -> CurrentMetrics {
        let process = self.probe.sample(Instant::now());
        let mut metrics = CurrentMetrics::derive(
            &self.totals,
            self.counting_since.elapsed(),
            process,
            now,
        );
        metrics.uptime = self.started.elapsed();
        metrics
    }

    pub fn summary(&mut self, window: TimeWindow, now: DateTime<Utc>) -> PerformanceSummary {
        let since = self.window_start(window, now);
        PerformanceSummary::build(
            window,
            self.queries.since(since),
            self.pipelines.since(since),
            self.errors.since(since),
        )
    }

    pub fn historical(&mut self, window: TimeWindow, metric: &str, now: DateTime<Utc>) -> Vec<DataPoint> {
        let since = self.window_start(window, now);
        extract_series(metric, self.queries.since(since))
    }

    pub fn check_alerts(&mut self, now: DateTime<Utc>) -> Vec<Alert> {
        let metrics = self.current_metrics(now);
        let alerts = evaluate(&metrics, &self.thresholds);
        for alert in &alerts {
            warn!(
                target: LOG_TARGET,
                alert = ?alert.alert_type,
                severity = ?alert.severity,
                message = %alert.message,
                "Alert raised"
            );
        }
        alerts
    }

    pub fn health(&mut self, now: DateTime<Utc>) -> HealthStatus {
        let alerts = self.check_alerts(now);
        HealthStatus::from_alerts(alerts, self.started.elapsed(), now)
    }

    pub fn set_thresholds(&mut self, thresholds: AlertThresholds) {
        self.thresholds = thresholds;
    }

    /// Zeroes the totals and empties every history. Uptime keeps counting.
    pub fn reset(&mut self) {
        self.totals = LiveTotals::default();
        self.counting_since = Instant::now();
        self.queries.clear();
        self.pipelines.clear();
        self.errors.clear();
    }

    /// Prunes stale samples, then returns where the window begins. Nothing
    /// older than the retention horizon is ever visible.
    fn window_start(&mut self, window: TimeWindow, now: DateTime<Utc>) -> DateTime<Utc> {
        let horizon = self.horizon(now);
        self.queries.prune(horizon);
        self.pipelines.prune(horizon);
        self.errors.prune(horizon);
        window
            .start(now)
            .map_or(horizon, |start| start.max(horizon))
    }
}

/// Serialises every write and read through one task, so concurrent
/// producers never lose updates and readers see a consistent snapshot.
pub async fn run_worker_loop(mut state: MonitorState, mut rx: UnboundedReceiver<MonitorMessage>) {
    info!(
        target: LOG_TARGET,
        retention_secs = state.retention.as_secs(),
        "Monitor worker started"
    );

    while let Some(msg) = rx.recv().await {
        if !handle_message(&mut state, msg) {
            break;
        }
    }

    info!(
        target: LOG_TARGET,
        queries = state.totals.queries,
        errors = state.totals.errors,
        "Monitor worker shutting down"
    );
}

fn handle_message(state: &mut MonitorState, msg: MonitorMessage) -> bool {
    let now = now_utc();
    match msg {
        MonitorMessage::RecordQuery(metric) => {
            debug!(
                target: LOG_TARGET,
                duration_ms = as_millis_f64(metric.duration),
                records = metric.record_count,
                "Query recorded"
            );
            state.record_query(metric, now);
        }
        MonitorMessage::RecordPipeline(metric) => state.record_pipeline(metric, now),
        MonitorMessage::RecordError(metric) => {
            debug!(target: LOG_TARGET, error_type = %metric.error_type, "Error recorded");
            state.record_error(metric, now);
        }
        MonitorMessage::RecordCacheAccess { hit } => state.record_cache_access(hit),
        MonitorMessage::CurrentMetrics { reply } => {
            let _ = reply.send(state.current_metrics(now));
        }
        MonitorMessage::Summary { window, reply } => {
            let _ = reply.send(state.summary(window, now));
        }
        MonitorMessage::Historical {
            window,
            metric,
            reply,
        } => {
            let _ = reply.send(state.historical(window, &metric, now));
        }
        MonitorMessage::CheckAlerts { reply } => {
            let _ = reply.send(state.check_alerts(now));
        }
        MonitorMessage::Health { reply } => {
            let _ = reply.send(state.health(now));
        }
        MonitorMessage::SetThresholds(thresholds) => state.set_thresholds(thresholds),
        MonitorMessage::Reset { reply } => {
            state.reset();
            info!(target: LOG_TARGET, "Metrics reset");
            let _ = reply.send(());
        }
        MonitorMessage::Shutdown { reply } => {
            let _ = reply.send(());
            return false;
        }
    }
    true
}
