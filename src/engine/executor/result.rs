use std::time::Duration;

use crate::engine::types::{Record, SizeEstimate};

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionMetadata {
    pub record_count: usize,
    pub execution_time: Duration,
    pub cache_hit: bool,
    pub relationships_loaded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub records: Vec<Record>,
    pub metadata: ExecutionMetadata,
}

impl ExecutionResult {
    pub fn new(
        records: Vec<Record>,
        execution_time: Duration,
        cache_hit: bool,
        relationships_loaded: Vec<String>,
    ) -> Self {
        Self {
            metadata: ExecutionMetadata {
                record_count: records.len(),
                execution_time,
                cache_hit,
                relationships_loaded,
            },
            records,
        }
    }

    pub fn estimated_size(&self) -> usize {
        self.records.estimated_size()
    }
}
