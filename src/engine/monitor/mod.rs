pub mod aggregate;
pub mod alerts;
pub mod handle;
pub mod history;
pub mod message;
pub mod metric;
pub mod probe;
pub mod summary;
pub mod window;
pub mod worker;

pub use aggregate::{CurrentMetrics, LiveTotals};
pub use alerts::{Alert, AlertType, HealthState, HealthStatus, Severity};
pub use handle::PerformanceMonitor;
pub use history::{MetricHistory, Sample};
pub use metric::{ErrorMetric, PipelineMetric, QueryMetric};
pub use summary::{DataPoint, MEMORY_USAGE, PerformanceSummary, QUERY_DURATION};
pub use window::TimeWindow;

#[cfg(test)]
mod summary_test;
