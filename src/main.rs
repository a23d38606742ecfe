use std::sync::Arc;

use clap::Parser;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use snel_loader::engine::cache::ReportCache;
use snel_loader::engine::errors::PipelineError;
use snel_loader::engine::executor::{MemorySource, QueryExecutor};
use snel_loader::engine::monitor::{PerformanceMonitor, TimeWindow};
use snel_loader::engine::pipeline::{
    PipelineConfig, PipelineOptions, Report, ResetScope, RunningVariables, VariableKind,
    VariableSpec, process_all, validate_config,
};
use snel_loader::engine::telemetry::TelemetryBus;
use snel_loader::engine::types::Record;
use snel_loader::logging;
use snel_loader::shared::config::CONFIG;

#[derive(Parser)]
#[command(name = "snel_loader")]
#[command(about = "Drive a synthetic report through the loader stack", long_about = None)]
struct Args {
    /// Number of synthetic order rows
    #[arg(short, long, default_value = "10000")]
    rows: usize,

    /// Distinct regions to group by
    #[arg(long, default_value = "8")]
    regions: usize,

    /// Records per chunk (defaults to the configured pipeline chunk size)
    #[arg(short, long)]
    chunk_size: Option<usize>,

    /// How many times to run the report; later runs hit the cache
    #[arg(long, default_value = "2")]
    runs: u32,

    /// Time window for the printed performance summary
    #[arg(short, long, default_value = "all_time")]
    window: TimeWindow,
}

fn synthetic_orders(rows: usize, regions: usize) -> Vec<Record> {
    let regions = regions.max(1);
    (1..=rows)
        .map(|id| {
            json!({
                "id": id,
                "region": format!("region-{:02}", id % regions),
                "amount": (id * 37) % 100,
            })
        })
        .collect()
}

fn variables() -> Arc<RunningVariables> {
    Arc::new(RunningVariables::new(vec![
        VariableSpec::new("region_total", "amount", VariableKind::Sum, ResetScope::Group(0)),
        VariableSpec::new("region_orders", "id", VariableKind::Count, ResetScope::Group(0)),
        VariableSpec::new("grand_total", "amount", VariableKind::Sum, ResetScope::Report),
        VariableSpec::new("largest", "amount", VariableKind::Max, ResetScope::Report),
    ]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&CONFIG.logging)?;
    info!(rows = args.rows, regions = args.regions, "snel_loader starting");

    let bus = TelemetryBus::new();
    let monitor = PerformanceMonitor::spawn(CONFIG.monitor.clone());
    monitor.attach(&bus);
    let cache: ReportCache<Vec<Record>> = ReportCache::spawn(CONFIG.cache.clone());

    let source = Arc::new(
        MemorySource::new("synthetic")
            .with_resource("orders", synthetic_orders(args.rows, args.regions)),
    );
    let report = Report::new("regional_sales", "orders")
        .group_by(["region"])
        .sort_by("id");

    let mut options = PipelineOptions::from_defaults(&CONFIG.pipeline);
    if let Some(chunk_size) = args.chunk_size {
        options.chunk_size = chunk_size;
    }

    let base = PipelineConfig::new(report, Map::new(), source, options)
        .with_executor(QueryExecutor::from_config(&CONFIG.executor))
        .with_cache(cache.clone())
        .with_telemetry(bus.clone());

    for run in 1..=args.runs {
        let config = base.clone().with_variable_state(variables());
        validate_config(&config)?;

        let result = process_all(&config).await?;
        let grand_total = result
            .results
            .last()
            .and_then(|r| r.variable_values.get("grand_total").cloned())
            .unwrap_or(Value::Null);

        println!(
            "run {run}: {} records, {} errors, {} cached, peak chunk {} bytes, {:.1} ms, grand total {grand_total}",
            result.summary.total_records,
            result.summary.errors.len(),
            result.summary.cache_hits,
            result.summary.memory_peak,
            result.summary.processing_time.as_secs_f64() * 1000.0,
        );
        for err in &result.summary.errors {
            match err {
                PipelineError::Executor(e) => e.log_error(),
                other => warn!(run, error = %other, "Record failed"),
            }
        }
    }

    let stats = cache.stats().await;
    println!(
        "cache: {} entries, {} hits, {} misses, hit ratio {:.2}",
        stats.size,
        stats.hit_count,
        stats.miss_count,
        stats.hit_ratio()
    );

    let summary = monitor.get_performance_summary(args.window).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    let health = monitor.get_health_status().await?;
    println!("{}", serde_json::to_string_pretty(&health)?);

    monitor.shutdown().await;
    cache.shutdown().await;
    info!("snel_loader finished");
    Ok(())
}
