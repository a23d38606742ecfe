use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// One executed query as reported by an executor or a caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetric {
    pub duration: Duration,
    pub record_count: usize,
    /// `None` when no result cache took part.
    pub cache_hit: Option<bool>,
    /// Process memory in bytes. Filled in from the process probe when absent.
    pub memory_usage: Option<u64>,
    pub resource: Option<String>,
    /// Recording time. Stamped by the monitor when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

impl QueryMetric {
    pub fn new(duration: Duration, record_count: usize) -> Self {
        Self {
            duration,
            record_count,
            cache_hit: None,
            memory_usage: None,
            resource: None,
            timestamp: None,
        }
    }

    pub fn with_cache_hit(mut self, hit: bool) -> Self {
        self.cache_hit = Some(hit);
        self
    }

    pub fn with_memory_usage(mut self, bytes: u64) -> Self {
        self.memory_usage = Some(bytes);
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetric {
    pub duration: Duration,
    pub records_processed: u64,
    pub memory_usage: u64,
    pub report: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PipelineMetric {
    pub fn new(duration: Duration, records_processed: u64, memory_usage: u64) -> Self {
        Self {
            duration,
            records_processed,
            memory_usage,
            report: None,
            timestamp: None,
        }
    }

    pub fn with_report(mut self, report: impl Into<String>) -> Self {
        self.report = Some(report.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMetric {
    pub error_type: String,
    pub context: Map<String, Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ErrorMetric {
    pub fn new(error_type: impl Into<String>, context: Map<String, Value>) -> Self {
        Self {
            error_type: error_type.into(),
            context,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
