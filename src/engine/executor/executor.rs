use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{debug, warn};

use crate::engine::cache::CacheLookup;
use crate::engine::errors::ExecutorError;
use crate::engine::telemetry::{TelemetryBus, TelemetryEvent, event_names};
use crate::engine::types::Record;
use crate::shared::config::ExecutorConfig;
use crate::shared::time::as_millis_f64;

use super::options::ExecuteOptions;
use super::query::Query;
use super::result::ExecutionResult;
use super::source::DataSource;
use super::stream::QueryStream;

const LOG_TARGET: &str = "engine::executor";

/// Runs prepared queries against a data source with a per-call timeout,
/// bounded retries and batched relationship loading.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    batch_size: usize,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    telemetry: Option<TelemetryBus>,
}

impl QueryExecutor {
    pub fn new(batch_size: usize, timeout: Duration, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            timeout,
            max_retries,
            retry_delay,
            telemetry: None,
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(
            config.batch_size,
            config.timeout(),
            config.max_retries,
            config.retry_delay(),
        )
    }

    /// Publishes `query.start`, `query.stop` and `error` events.
    pub fn with_telemetry(mut self, bus: TelemetryBus) -> Self {
        self.telemetry = Some(bus);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn execute_query(
        &self,
        query: &Query,
        source: &dyn DataSource,
        options: &ExecuteOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        let started = Instant::now();
        let resource = query.resource().unwrap_or_default().to_string();
        self.publish(TelemetryEvent::new(event_names::QUERY_START).meta("resource", resource.as_str()));

        let relationships = if options.load_relationships {
            query.relationships.clone()
        } else {
            Vec::new()
        };

        if let Some(caching) = &options.caching {
            if let CacheLookup::Hit(records) = caching.cache.get(&caching.key).await {
                let result = ExecutionResult::new(records, started.elapsed(), true, relationships);
                self.publish_stop(&resource, &result, true);
                return Ok(result);
            }
        }

        let timeout = options.timeout.unwrap_or(self.timeout);
        let run = AssertUnwindSafe(self.run_query(query, source, options, &relationships)).catch_unwind();

        let outcome = match tokio::time::timeout(timeout, run).await {
            Err(_) => Err(ExecutorError::Timeout(timeout)),
            Ok(Err(panic)) => Err(ExecutorError::Unexpected(panic_message(panic))),
            Ok(Ok(inner)) => inner,
        };

        match outcome {
            Ok(records) => {
                if let Some(caching) = &options.caching {
                    caching
                        .cache
                        .put(caching.key.clone(), records.clone(), caching.ttl, true)
                        .await;
                }
                let result = ExecutionResult::new(records, started.elapsed(), false, relationships);
                debug!(
                    target: LOG_TARGET,
                    resource = %resource,
                    records = result.metadata.record_count,
                    elapsed_ms = as_millis_f64(result.metadata.execution_time),
                    "Query executed"
                );
                self.publish_stop(&resource, &result, options.caching.is_some());
                Ok(result)
            }
            Err(err) => {
                self.publish_error(&err, &resource);
                Err(err)
            }
        }
    }

    /// Pull-based cursor that fetches `chunk_size` records per pull.
    pub fn stream_query(
        &self,
        query: Query,
        source: Arc<dyn DataSource>,
        options: ExecuteOptions,
        chunk_size: usize,
    ) -> QueryStream {
        QueryStream::new(self.clone(), query, source, options, chunk_size)
    }

    /// Loads each named relationship onto the records, `batch_size` records
    /// at a time. Batches run left to right; the first failure stops the
    /// whole operation and later batches are never started.
    pub async fn load_relationships(
        &self,
        records: Vec<Record>,
        relationships: &[String],
        source: &dyn DataSource,
        options: &ExecuteOptions,
    ) -> Result<Vec<Record>, ExecutorError> {
        if records.is_empty() || relationships.is_empty() {
            return Ok(records);
        }

        let actor = options.actor.as_ref();
        let mut loaded = Vec::with_capacity(records.len());
        let mut remaining = records.into_iter().peekable();

        while remaining.peek().is_some() {
            let mut batch: Vec<Record> = remaining.by_ref().take(self.batch_size).collect();
            for relationship in relationships {
                batch = source
                    .load(batch, relationship, actor)
                    .await
                    .map_err(|source| ExecutorError::Relationship {
                        relationship: relationship.clone(),
                        source,
                    })?;
            }
            loaded.extend(batch);
        }

        Ok(loaded)
    }

    /// Retries retryable failures with a linearly growing delay. The last
    /// permitted attempt is a plain `execute_query`.
    pub async fn execute_with_retry(
        &self,
        query: &Query,
        source: &dyn DataSource,
        options: &ExecuteOptions,
    ) -> Result<ExecutionResult, ExecutorError> {
        let attempts = self.max_retries.max(1);

        for attempt in 1..attempts {
            match self.execute_query(query, source, options).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_retryable() => {
                    let delay = self.retry_delay * attempt;
                    warn!(
                        target: LOG_TARGET,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = as_millis_f64(delay),
                        error = %err,
                        "Retrying query"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }

        self.execute_query(query, source, options).await
    }

    pub fn validate_execution_context(
        &self,
        query: &Query,
        source: &dyn DataSource,
    ) -> Result<(), ExecutorError> {
        if !source.is_loaded() {
            return Err(ExecutorError::InvalidContext(format!(
                "data source '{}' is not loaded",
                source.name()
            )));
        }
        if !source.supports_read() {
            return Err(ExecutorError::InvalidContext(format!(
                "data source '{}' does not support reads",
                source.name()
            )));
        }

        let resource = match query.resource() {
            Some(r) if !r.trim().is_empty() => r,
            _ => {
                return Err(ExecutorError::InvalidContext(
                    "query has no resource".to_string(),
                ));
            }
        };

        if !source.resources().iter().any(|r| r == resource) {
            return Err(ExecutorError::InvalidContext(format!(
                "resource '{}' does not belong to data source '{}'",
                resource,
                source.name()
            )));
        }

        Ok(())
    }

    async fn run_query(
        &self,
        query: &Query,
        source: &dyn DataSource,
        options: &ExecuteOptions,
        relationships: &[String],
    ) -> Result<Vec<Record>, ExecutorError> {
        let records = source
            .read(query, options.actor.as_ref())
            .await?
            .into_records();

        let records = self
            .load_relationships(records, relationships, source, options)
            .await?;

        Ok(match &options.post_process {
            Some(hook) => hook(records),
            None => records,
        })
    }

    fn publish(&self, event: TelemetryEvent) {
        if let Some(bus) = &self.telemetry {
            bus.publish(event);
        }
    }

    /// `cache_hit` is only reported when a result cache took part in the call.
    fn publish_stop(&self, resource: &str, result: &ExecutionResult, cached: bool) {
        let mut event = TelemetryEvent::new(event_names::QUERY_STOP)
            .measure("duration_ms", as_millis_f64(result.metadata.execution_time))
            .measure("record_count", result.metadata.record_count as u64)
            .meta("resource", resource);
        if cached {
            event = event.meta("cache_hit", result.metadata.cache_hit);
        }
        self.publish(event);
    }

    fn publish_error(&self, err: &ExecutorError, resource: &str) {
        self.publish(
            TelemetryEvent::new(event_names::ERROR)
                .meta("error_type", err.kind_label())
                .meta("message", err.to_string())
                .meta("resource", resource),
        );
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "data source panicked".to_string()
    }
}
