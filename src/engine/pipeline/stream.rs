use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::Stream;
use serde_json::Map;
use tracing::{debug, info, warn};

use crate::engine::errors::PipelineError;
use crate::engine::executor::QueryStream;
use crate::engine::telemetry::{TelemetryBus, TelemetryEvent, event_names};
use crate::engine::types::{Record, SizeEstimate};
use crate::shared::time::as_millis_f64;

use super::group::{GroupOutcome, GroupProcessor, GroupState};
use super::result::{ProcessingMetadata, ProcessingResult};
use super::variables::VariableState;

const LOG_TARGET: &str = "engine::pipeline::stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Initialized,
    Streaming,
    Drained,
    Failed,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    chunks: u64,
    processed: u64,
    errors: u64,
}

/// Stateful transform over a query cursor. Owns the group state and the
/// counters exclusively; records are handled strictly in arrival order and
/// only one chunk is buffered at a time. The next chunk is requested only
/// once the current one has been fully handed out.
pub struct ProcessingStream {
    report: String,
    cursor: QueryStream,
    group_processor: Option<Arc<dyn GroupProcessor>>,
    variables: Option<Arc<dyn VariableState>>,
    group_state: GroupState,
    pending: VecDeque<Record>,
    chunk_bytes: usize,
    chunk_cache_hit: bool,
    memory_peak: usize,
    max_memory_bytes: usize,
    counters: Counters,
    state: StreamState,
    started: Instant,
    timeout: Duration,
    telemetry: Option<TelemetryBus>,
}

impl ProcessingStream {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        report: String,
        cursor: QueryStream,
        group_processor: Option<Arc<dyn GroupProcessor>>,
        variables: Option<Arc<dyn VariableState>>,
        max_memory_bytes: usize,
        timeout: Duration,
        telemetry: Option<TelemetryBus>,
    ) -> Self {
        let group_state = group_processor
            .as_ref()
            .map(|p| p.initial_state())
            .unwrap_or_default();
        Self {
            report,
            cursor,
            group_processor,
            variables,
            group_state,
            pending: VecDeque::new(),
            chunk_bytes: 0,
            chunk_cache_hit: false,
            memory_peak: 0,
            max_memory_bytes,
            counters: Counters::default(),
            state: StreamState::Initialized,
            started: Instant::now(),
            timeout,
            telemetry,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Largest estimated chunk footprint seen so far.
    pub fn memory_peak(&self) -> usize {
        self.memory_peak
    }

    pub fn group_state(&self) -> &GroupState {
        &self.group_state
    }

    pub async fn next_result(&mut self) -> Option<Result<ProcessingResult, PipelineError>> {
        match self.state {
            StreamState::Drained | StreamState::Failed => return None,
            StreamState::Initialized => self.start(),
            StreamState::Streaming => {}
        }

        while self.pending.is_empty() {
            if let Err(err) = self.fill().await? {
                return Some(Err(self.fail(err)));
            }
        }

        let record = self.pending.pop_front()?;
        Some(match self.process_record(record) {
            Ok(mut result) => {
                self.counters.processed += 1;
                result.metadata.timestamp = Some(Utc::now());
                Ok(result)
            }
            Err(err) => {
                self.counters.errors += 1;
                warn!(target: LOG_TARGET, report = %self.report, error = %err, "Record failed");
                self.publish_error(&err);
                Err(err)
            }
        })
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<ProcessingResult, PipelineError>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            let item = stream.next_result().await?;
            Some((item, stream))
        })
    }

    fn start(&mut self) {
        self.state = StreamState::Streaming;
        self.started = Instant::now();
        info!(target: LOG_TARGET, report = %self.report, "Pipeline started");
        self.publish(TelemetryEvent::new(event_names::PIPELINE_START).meta("report", self.report.as_str()));
    }

    /// Pulls the next chunk into `pending`. `None` means the cursor is done.
    async fn fill(&mut self) -> Option<Result<(), PipelineError>> {
        let remaining = self.timeout.saturating_sub(self.started.elapsed());
        if remaining.is_zero() {
            return Some(Err(PipelineError::Timeout(self.timeout)));
        }

        let chunk = match tokio::time::timeout(remaining, self.cursor.next_chunk()).await {
            Err(_) => return Some(Err(PipelineError::Timeout(self.timeout))),
            Ok(None) => {
                self.finish();
                return None;
            }
            Ok(Some(Err(err))) => return Some(Err(PipelineError::Executor(err))),
            Ok(Some(Ok(chunk))) => chunk,
        };

        let bytes = chunk.records.estimated_size();
        if bytes > self.max_memory_bytes {
            return Some(Err(PipelineError::Memory(format!(
                "chunk at offset {} needs ~{} bytes, budget is {}",
                chunk.offset, bytes, self.max_memory_bytes
            ))));
        }

        self.counters.chunks += 1;
        self.chunk_bytes = bytes;
        self.chunk_cache_hit = chunk.cache_hit;
        self.memory_peak = self.memory_peak.max(bytes);
        debug!(
            target: LOG_TARGET,
            report = %self.report,
            offset = chunk.offset,
            records = chunk.records.len(),
            cache_hit = chunk.cache_hit,
            "Chunk buffered"
        );
        self.pending.extend(chunk.records);
        Some(Ok(()))
    }

    fn process_record(&mut self, record: Record) -> Result<ProcessingResult, PipelineError> {
        let started = Instant::now();

        let outcome = match &self.group_processor {
            Some(processor) => {
                let (next_state, outcome) = processor
                    .process_record(&self.group_state, record)
                    .map_err(PipelineError::Group)?;
                self.group_state = next_state;
                outcome
            }
            None => GroupOutcome {
                record,
                group_changes: Vec::new(),
                group_values: Map::new(),
                should_reset_variables: false,
            },
        };

        let variable_values = match &self.variables {
            Some(variables) => {
                for change in &outcome.group_changes {
                    variables.handle_scope_change(change);
                }
                variables
                    .update_variables_ordered(&outcome.record)
                    .map_err(PipelineError::Variables)?;
                variables.get_all_values()
            }
            None => Map::new(),
        };

        Ok(ProcessingResult {
            record: outcome.record,
            group_state: self.group_state.clone(),
            variable_values,
            group_changes: outcome.group_changes,
            metadata: ProcessingMetadata {
                processing_time: started.elapsed(),
                memory_usage: self.chunk_bytes,
                cache_hit: self.chunk_cache_hit,
                timestamp: None,
            },
        })
    }

    fn finish(&mut self) {
        self.state = StreamState::Drained;
        let elapsed = self.started.elapsed();
        info!(
            target: LOG_TARGET,
            report = %self.report,
            chunks = self.counters.chunks,
            processed = self.counters.processed,
            errors = self.counters.errors,
            elapsed_ms = as_millis_f64(elapsed),
            "Pipeline drained"
        );
        self.publish(
            TelemetryEvent::new(event_names::PIPELINE_STOP)
                .measure("duration_ms", as_millis_f64(elapsed))
                .measure("records_processed", self.counters.processed)
                .measure("memory_usage", self.memory_peak as u64)
                .measure("errors", self.counters.errors)
                .meta("report", self.report.as_str()),
        );
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        self.state = StreamState::Failed;
        self.pending.clear();
        warn!(target: LOG_TARGET, report = %self.report, error = %err, "Pipeline failed");
        // The executor already reported its own failures.
        if !matches!(err, PipelineError::Executor(_)) {
            self.publish_error(&err);
        }
        err
    }

    fn publish(&self, event: TelemetryEvent) {
        if let Some(bus) = &self.telemetry {
            bus.publish(event);
        }
    }

    fn publish_error(&self, err: &PipelineError) {
        self.publish(
            TelemetryEvent::new(event_names::ERROR)
                .meta("error_type", err.kind_label())
                .meta("message", err.to_string())
                .meta("report", self.report.as_str()),
        );
    }
}

impl std::fmt::Debug for ProcessingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingStream")
            .field("report", &self.report)
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("counters", &self.counters)
            .finish()
    }
}
