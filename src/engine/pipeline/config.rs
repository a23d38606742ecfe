use std::sync::Arc;
use std::time::Duration;

use crate::engine::cache::ReportCache;
use crate::engine::executor::{DataSource, QueryExecutor};
use crate::engine::telemetry::TelemetryBus;
use crate::engine::types::{Actor, Params, Record};
use crate::shared::config::{ExecutorConfig, PipelineDefaults};

use super::group::{FieldGroupProcessor, GroupProcessor};
use super::query_builder::{QueryBuilder, ReportQueryBuilder};
use super::report::Report;
use super::variables::VariableState;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub enable_caching: bool,
    pub enable_monitoring: bool,
    pub max_memory_mb: usize,
    /// Bound on one whole run, not on a single chunk.
    pub timeout: Duration,
    pub actor: Option<Actor>,
}

impl PipelineOptions {
    pub fn from_defaults(defaults: &PipelineDefaults) -> Self {
        Self {
            chunk_size: defaults.chunk_size,
            enable_caching: defaults.enable_caching,
            enable_monitoring: defaults.enable_monitoring,
            max_memory_mb: defaults.max_memory_mb,
            timeout: Duration::from_millis(defaults.timeout_ms),
            actor: None,
        }
    }

    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_defaults(&PipelineDefaults::default())
    }
}

/// Everything one report invocation needs. Built once, then only read.
#[derive(Clone)]
pub struct PipelineConfig {
    pub report: Arc<Report>,
    pub params: Params,
    pub domain: Arc<dyn DataSource>,
    pub executor: QueryExecutor,
    pub query_builder: Arc<dyn QueryBuilder>,
    pub group_processor: Option<Arc<dyn GroupProcessor>>,
    pub variable_state: Option<Arc<dyn VariableState>>,
    pub cache: Option<ReportCache<Vec<Record>>>,
    pub telemetry: Option<TelemetryBus>,
    pub options: PipelineOptions,
}

impl PipelineConfig {
    /// Defaults: executor from `ExecutorConfig::default()`, the report query
    /// builder, and a field group processor over the report's group fields.
    pub fn new(
        report: Report,
        params: Params,
        domain: Arc<dyn DataSource>,
        options: PipelineOptions,
    ) -> Self {
        let group_processor: Arc<dyn GroupProcessor> =
            Arc::new(FieldGroupProcessor::new(report.group_fields.clone()));
        Self {
            report: Arc::new(report),
            params,
            domain,
            executor: QueryExecutor::from_config(&ExecutorConfig::default()),
            query_builder: Arc::new(ReportQueryBuilder),
            group_processor: Some(group_processor),
            variable_state: None,
            cache: None,
            telemetry: None,
            options,
        }
    }

    pub fn with_executor(mut self, executor: QueryExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_query_builder(mut self, builder: Arc<dyn QueryBuilder>) -> Self {
        self.query_builder = builder;
        self
    }

    pub fn with_group_processor(mut self, processor: Option<Arc<dyn GroupProcessor>>) -> Self {
        self.group_processor = processor;
        self
    }

    pub fn with_variable_state(mut self, state: Arc<dyn VariableState>) -> Self {
        self.variable_state = Some(state);
        self
    }

    pub fn with_cache(mut self, cache: ReportCache<Vec<Record>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_telemetry(mut self, bus: TelemetryBus) -> Self {
        self.telemetry = Some(bus);
        self
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("report", &self.report.name)
            .field("params", &self.params)
            .field("domain", &self.domain.name())
            .field("executor", &self.executor)
            .field("group_processor", &self.group_processor.is_some())
            .field("variable_state", &self.variable_state.is_some())
            .field("cache", &self.cache.is_some())
            .field("options", &self.options)
            .finish()
    }
}
