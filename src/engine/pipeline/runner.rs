use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use serde_json::json;
use tracing::{error, info};

use crate::engine::cache::{Ttl, build_key};
use crate::engine::errors::PipelineError;
use crate::engine::executor::{ExecuteOptions, ResultCaching};
use crate::shared::time::as_millis_f64;

use super::config::PipelineConfig;
use super::query_builder::BuildOptions;
use super::result::{PipelineResult, PipelineSummary, ProcessingResult};
use super::stream::ProcessingStream;

const LOG_TARGET: &str = "engine::pipeline::runner";

/// Pure per-item mapping applied on top of the annotated stream.
pub type ProcessingTransform = Arc<dyn Fn(ProcessingResult) -> ProcessingResult + Send + Sync>;

/// Builds the query and opens the annotated record stream. Nothing is
/// fetched until the first pull.
pub fn process_stream(config: &PipelineConfig) -> Result<ProcessingStream, PipelineError> {
    let report = &config.report;
    let query = config
        .query_builder
        .build(report, &config.params, BuildOptions::default())
        .map_err(PipelineError::QueryBuild)?;

    let monitoring = config
        .telemetry
        .as_ref()
        .filter(|_| config.options.enable_monitoring)
        .cloned();

    let executor = match &monitoring {
        Some(bus) => config.executor.clone().with_telemetry(bus.clone()),
        None => config.executor.clone(),
    };

    let actor = config.options.actor.clone();
    let mut options = ExecuteOptions {
        actor: actor.clone(),
        load_relationships: !query.relationships.is_empty(),
        ..ExecuteOptions::default()
    };

    if config.options.enable_caching {
        if let Some(cache) = &config.cache {
            let key = build_key(
                &report.name,
                &config.params,
                "stream",
                Some(&json!({ "chunk_size": config.options.chunk_size })),
                actor.as_ref().map(|a| a.id.as_str()),
            );
            options.caching = Some(ResultCaching {
                cache: cache.clone(),
                key,
                ttl: Ttl::Default,
            });
        }
    }

    let cursor = executor.stream_query(
        query,
        Arc::clone(&config.domain),
        options,
        config.options.chunk_size,
    );

    Ok(ProcessingStream::new(
        report.name.clone(),
        cursor,
        config.group_processor.clone(),
        config.variable_state.clone(),
        config.options.max_memory_bytes(),
        config.options.timeout,
        monitoring,
    ))
}

/// Drains the stream into successes (input order kept) and errors.
pub async fn process_all(config: &PipelineConfig) -> Result<PipelineResult, PipelineError> {
    let started = Instant::now();
    let mut stream = process_stream(config)?;

    let drained = AssertUnwindSafe(async {
        let mut results = Vec::new();
        let mut errors = Vec::new();
        while let Some(item) = stream.next_result().await {
            match item {
                Ok(result) => results.push(result),
                Err(err) => errors.push(err),
            }
        }
        (results, errors)
    })
    .catch_unwind()
    .await;

    let (results, errors) = match drained {
        Ok(parts) => parts,
        Err(_) => {
            error!(target: LOG_TARGET, report = %config.report.name, "Pipeline drain panicked");
            return Err(PipelineError::Unexpected(format!(
                "draining report '{}' panicked",
                config.report.name
            )));
        }
    };

    let summary = PipelineSummary {
        total_records: results.len(),
        processing_time: started.elapsed(),
        memory_peak: stream.memory_peak(),
        cache_hits: results.iter().filter(|r| r.metadata.cache_hit).count(),
        errors,
    };
    info!(
        target: LOG_TARGET,
        report = %config.report.name,
        records = summary.total_records,
        errors = summary.errors.len(),
        elapsed_ms = as_millis_f64(summary.processing_time),
        "Pipeline result built"
    );

    Ok(PipelineResult { results, summary })
}

/// Front-loads every configuration problem that can be detected without
/// touching the data.
pub fn validate_config(config: &PipelineConfig) -> Result<(), PipelineError> {
    config.report.validate().map_err(PipelineError::Config)?;

    let domain = &config.domain;
    if !domain.is_loaded() {
        return Err(PipelineError::Config(format!(
            "data source '{}' is not loaded",
            domain.name()
        )));
    }
    if !domain.supports_read() {
        return Err(PipelineError::Config(format!(
            "data source '{}' does not support reads",
            domain.name()
        )));
    }
    if !domain.resources().contains(&config.report.resource) {
        return Err(PipelineError::Config(format!(
            "resource '{}' does not belong to data source '{}'",
            config.report.resource,
            domain.name()
        )));
    }

    if config.executor.timeout().is_zero() {
        return Err(PipelineError::Config("executor timeout must be positive".into()));
    }
    if config.options.chunk_size == 0 {
        return Err(PipelineError::Config("chunk_size must be positive".into()));
    }
    if config.options.max_memory_mb == 0 {
        return Err(PipelineError::Config("max_memory_mb must be positive".into()));
    }
    if config.options.timeout.is_zero() {
        return Err(PipelineError::Config("pipeline timeout must be positive".into()));
    }

    if let Some(variables) = &config.variable_state {
        if !variables.is_alive() {
            return Err(PipelineError::Config(
                "variable state handle is no longer alive".into(),
            ));
        }
    }

    if let Some(processor) = &config.group_processor {
        processor.validate().map_err(PipelineError::Config)?;
    }

    Ok(())
}

/// Applies caller transforms, in order, to every successful item.
/// Errors pass through untouched.
pub fn create_custom_pipeline(
    config: &PipelineConfig,
    transforms: Vec<ProcessingTransform>,
) -> Result<BoxStream<'static, Result<ProcessingResult, PipelineError>>, PipelineError> {
    let base = process_stream(config)?.into_stream();
    let transforms = Arc::new(transforms);

    Ok(base
        .map(move |item| item.map(|result| transforms.iter().fold(result, |acc, f| f(acc))))
        .boxed())
}
