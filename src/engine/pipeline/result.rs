use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::engine::errors::PipelineError;
use crate::engine::types::Record;

use super::group::{GroupChange, GroupState};

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingMetadata {
    pub processing_time: Duration,
    /// Estimated bytes of the chunk this record arrived in.
    pub memory_usage: usize,
    pub cache_hit: bool,
    /// Set as the last step before the result is handed out.
    pub timestamp: Option<DateTime<Utc>>,
}

/// One annotated input record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub record: Record,
    pub group_state: GroupState,
    pub variable_values: Map<String, Value>,
    pub group_changes: Vec<GroupChange>,
    pub metadata: ProcessingMetadata,
}

#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub total_records: usize,
    pub processing_time: Duration,
    pub memory_peak: usize,
    pub cache_hits: usize,
    pub errors: Vec<PipelineError>,
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Successful results in input order.
    pub results: Vec<ProcessingResult>,
    pub summary: PipelineSummary,
}

impl PipelineResult {
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.results.iter().map(|r| &r.record)
    }
}
