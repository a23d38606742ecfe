use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::aggregate::{bytes_to_mb, ratio};
use super::history::Sample;
use super::metric::{ErrorMetric, PipelineMetric, QueryMetric};
use super::window::TimeWindow;

pub const QUERY_DURATION: &str = "query_duration";
pub const MEMORY_USAGE: &str = "memory_usage";

/// Figures computed purely from the history samples inside a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub window: TimeWindow,
    pub total_queries: usize,
    pub total_records: u64,
    pub avg_response_time_ms: f64,
    pub peak_memory_mb: f64,
    /// Hits over queries that went through a result cache.
    pub cache_efficiency: f64,
    pub error_count: usize,
    pub pipelines_processed: usize,
    pub pipeline_records: u64,
}

impl PerformanceSummary {
    pub fn build<'a>(
        window: TimeWindow,
        queries: impl Iterator<Item = &'a Sample<QueryMetric>>,
        pipelines: impl Iterator<Item = &'a Sample<PipelineMetric>>,
        errors: impl Iterator<Item = &'a Sample<ErrorMetric>>,
    ) -> Self {
        let mut total_queries = 0usize;
        let mut total_records = 0u64;
        let mut total_time = Duration::ZERO;
        let mut peak_memory = 0u64;
        let (mut hits, mut lookups) = (0u64, 0u64);

        for sample in queries {
            let q = &sample.metric;
            total_queries += 1;
            total_records += q.record_count as u64;
            total_time += q.duration;
            peak_memory = peak_memory.max(q.memory_usage.unwrap_or(0));
            if let Some(hit) = q.cache_hit {
                lookups += 1;
                hits += u64::from(hit);
            }
        }

        let (mut pipelines_processed, mut pipeline_records) = (0usize, 0u64);
        for sample in pipelines {
            pipelines_processed += 1;
            pipeline_records += sample.metric.records_processed;
            peak_memory = peak_memory.max(sample.metric.memory_usage);
        }

        Self {
            window,
            total_queries,
            total_records,
            avg_response_time_ms: ratio(
                total_time.as_secs_f64() * 1000.0,
                total_queries as f64,
            ),
            peak_memory_mb: bytes_to_mb(peak_memory),
            cache_efficiency: ratio(hits as f64, lookups as f64),
            error_count: errors.count(),
            pipelines_processed,
            pipeline_records,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Extracts one named series from the query history. Unknown names give
/// an empty series.
pub fn extract_series<'a>(
    metric: &str,
    queries: impl Iterator<Item = &'a Sample<QueryMetric>>,
) -> Vec<DataPoint> {
    let value: fn(&QueryMetric) -> Option<f64> = match metric {
        QUERY_DURATION => |q| Some(q.duration.as_secs_f64() * 1000.0),
        MEMORY_USAGE => |q| q.memory_usage.map(bytes_to_mb),
        _ => return Vec::new(),
    };

    queries
        .filter_map(|sample| {
            value(&sample.metric).map(|value| DataPoint {
                timestamp: sample.at,
                value,
            })
        })
        .collect()
}
