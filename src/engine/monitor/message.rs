use tokio::sync::oneshot::Sender;

use crate::shared::config::AlertThresholds;

use super::aggregate::CurrentMetrics;
use super::alerts::{Alert, HealthStatus};
use super::metric::{ErrorMetric, PipelineMetric, QueryMetric};
use super::summary::{DataPoint, PerformanceSummary};
use super::window::TimeWindow;

/// Everything the monitor worker can be asked to do. Recording variants
/// carry no reply channel.
#[derive(Debug)]
pub enum MonitorMessage {
    RecordQuery(QueryMetric),
    RecordPipeline(PipelineMetric),
    RecordError(ErrorMetric),
    RecordCacheAccess {
        hit: bool,
    },
    CurrentMetrics {
        reply: Sender<CurrentMetrics>,
    },
    Summary {
        window: TimeWindow,
        reply: Sender<PerformanceSummary>,
    },
    Historical {
        window: TimeWindow,
        metric: String,
        reply: Sender<Vec<DataPoint>>,
    },
    CheckAlerts {
        reply: Sender<Vec<Alert>>,
    },
    Health {
        reply: Sender<HealthStatus>,
    },
    SetThresholds(AlertThresholds),
    Reset {
        reply: Sender<()>,
    },
    Shutdown {
        reply: Sender<()>,
    },
}
