use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::metric::{PipelineMetric, QueryMetric};
use super::probe::ProcessSnapshot;

/// Running totals, bumped once per recorded event and never rebuilt from
/// history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveTotals {
    pub queries: u64,
    pub records: u64,
    pub query_time: Duration,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors: u64,
    pub pipelines: u64,
    pub pipeline_records: u64,
}

impl LiveTotals {
    pub fn apply_query(&mut self, metric: &QueryMetric) {
        self.queries += 1;
        self.records += metric.record_count as u64;
        self.query_time += metric.duration;
        if let Some(hit) = metric.cache_hit {
            self.apply_cache_access(hit);
        }
    }

    pub fn apply_cache_access(&mut self, hit: bool) {
        if hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
    }

    pub fn apply_pipeline(&mut self, metric: &PipelineMetric) {
        self.pipelines += 1;
        self.pipeline_records += metric.records_processed;
    }

    pub fn apply_error(&mut self) {
        self.errors += 1;
    }
}

/// Live view derived from `LiveTotals` at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentMetrics {
    pub uptime: Duration,
    pub total_queries: u64,
    pub total_records: u64,
    pub total_query_time: Duration,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors: u64,
    pub pipelines_processed: u64,
    pub queries_per_second: f64,
    pub avg_query_time_ms: f64,
    pub cache_hit_ratio: f64,
    /// Failed operations over all finished ones (queries plus errors).
    pub error_rate: f64,
    pub memory_usage_mb: f64,
    pub thread_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl CurrentMetrics {
    pub fn derive(
        totals: &LiveTotals,
        uptime: Duration,
        process: ProcessSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let uptime_secs = uptime.as_secs_f64();
        let lookups = totals.cache_hits + totals.cache_misses;
        let finished = totals.queries + totals.errors;

        Self {
            uptime,
            total_queries: totals.queries,
            total_records: totals.records,
            total_query_time: totals.query_time,
            cache_hits: totals.cache_hits,
            cache_misses: totals.cache_misses,
            errors: totals.errors,
            pipelines_processed: totals.pipelines,
            queries_per_second: ratio(totals.queries as f64, uptime_secs),
            avg_query_time_ms: ratio(
                totals.query_time.as_secs_f64() * 1000.0,
                totals.queries as f64,
            ),
            cache_hit_ratio: ratio(totals.cache_hits as f64, lookups as f64),
            error_rate: ratio(totals.errors as f64, finished as f64),
            memory_usage_mb: bytes_to_mb(process.memory_bytes),
            thread_count: process.threads,
            timestamp,
        }
    }
}

pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
