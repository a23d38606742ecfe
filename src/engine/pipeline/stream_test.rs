use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Map, json};

use super::config::{PipelineConfig, PipelineOptions};
use super::report::Report;
use super::runner::process_stream;
use super::stream::StreamState;
use crate::engine::errors::{PipelineError, SourceErrorKind};
use crate::engine::executor::QueryExecutor;
use crate::engine::telemetry::{TelemetryBus, TelemetryEvent, event_names};
use crate::logging::init_for_tests;
use crate::test_helpers::factories::ScriptedSource;
use crate::test_helpers::factory::Factory;

fn grouped_source() -> Arc<ScriptedSource> {
    Arc::new(
        Factory::source()
            .with_records(Factory::record().create_grouped(5, "region", &["a", "b"], 3))
            .create(),
    )
}

fn config(source: Arc<ScriptedSource>) -> PipelineConfig {
    let options = PipelineOptions {
        chunk_size: 2,
        ..PipelineOptions::default()
    };
    PipelineConfig::new(
        Report::new("sales", "orders").group_by(["region"]),
        Map::new(),
        source,
        options,
    )
    .with_executor(QueryExecutor::new(10, Duration::from_millis(500), 1, Duration::ZERO))
}

#[tokio::test]
async fn preserves_order_and_threads_group_state_across_chunks() {
    init_for_tests();
    let source = grouped_source();
    let results: Vec<_> = process_stream(&config(source.clone()))
        .unwrap()
        .into_stream()
        .map(|r| r.unwrap())
        .collect()
        .await;

    let ids: Vec<_> = results.iter().map(|r| r.record["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);

    // Record 4 opens group "b" even though it sits in the second chunk.
    let breaks: Vec<usize> = results.iter().map(|r| r.group_changes.len()).collect();
    assert_eq!(breaks, vec![0, 0, 0, 1, 0]);
    assert_eq!(results[3].group_state.values["region"], json!("b"));
    assert_eq!(results[4].group_state.records_seen, 5);
    assert!(results.iter().all(|r| r.metadata.timestamp.is_some()));
    assert_eq!(source.read_offsets(), vec![0, 2, 4]);
}

#[tokio::test]
async fn scope_changes_reach_variables_before_the_update() {
    init_for_tests();
    let vars = Arc::new(Factory::variables().create());
    let cfg = config(grouped_source()).with_variable_state(vars.clone());

    let results: Vec<_> = process_stream(&cfg).unwrap().into_stream().collect().await;

    assert_eq!(results.len(), 5);
    assert_eq!(
        vars.log(),
        vec![
            "update:1",
            "update:2",
            "update:3",
            "scope:0:region",
            "update:4",
            "update:5"
        ]
    );
    let last = results[4].as_ref().unwrap();
    assert_eq!(last.variable_values["seen"], json!(5));
}

#[tokio::test]
async fn a_bad_record_is_reported_inline() {
    init_for_tests();
    let vars = Arc::new(Factory::variables().failing_on("id", 2).create());
    let cfg = config(grouped_source()).with_variable_state(vars);

    let mut stream = process_stream(&cfg).unwrap();
    let mut outcomes = Vec::new();
    while let Some(item) = stream.next_result().await {
        outcomes.push(item.is_ok());
        if let Err(err) = item {
            assert!(matches!(err, PipelineError::Variables(_)));
        }
    }

    assert_eq!(outcomes, vec![true, false, true, true, true]);
    assert_eq!(stream.state(), StreamState::Drained);
}

#[tokio::test]
async fn oversize_chunk_fails_the_run() {
    init_for_tests();
    let mut cfg = config(grouped_source());
    cfg.options.max_memory_mb = 0;

    let mut stream = process_stream(&cfg).unwrap();
    let first = stream.next_result().await.unwrap();

    assert!(matches!(first, Err(PipelineError::Memory(_))));
    assert!(stream.next_result().await.is_none());
    assert_eq!(stream.state(), StreamState::Failed);
}

#[tokio::test]
async fn whole_run_timeout() {
    init_for_tests();
    let source = Arc::new(
        Factory::source()
            .with_records(Factory::record().create_list(6))
            .with_latency(Duration::from_millis(70))
            .create(),
    );
    let mut cfg = config(source);
    cfg.options.timeout = Duration::from_millis(100);

    let items: Vec<_> = process_stream(&cfg).unwrap().into_stream().collect().await;

    let (ok, err): (Vec<_>, Vec<_>) = items.into_iter().partition(|r| r.is_ok());
    assert_eq!(ok.len(), 2);
    assert_eq!(err.len(), 1);
    assert!(matches!(err[0], Err(PipelineError::Timeout(_))));
}

#[tokio::test]
async fn executor_failure_ends_the_stream() {
    init_for_tests();
    let source = Arc::new(
        Factory::source()
            .failing(1, SourceErrorKind::Authorization)
            .create(),
    );

    let items: Vec<_> = process_stream(&config(source))
        .unwrap()
        .into_stream()
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(PipelineError::Executor(_))));
}

#[tokio::test]
async fn without_a_group_processor_records_pass_through() {
    init_for_tests();
    let cfg = config(grouped_source()).with_group_processor(None);

    let results: Vec<_> = process_stream(&cfg)
        .unwrap()
        .into_stream()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.group_changes.is_empty()));
    assert!(results.iter().all(|r| r.group_state.values.is_empty()));
}

#[tokio::test]
async fn nothing_runs_until_pulled() {
    init_for_tests();
    let source = grouped_source();
    let stream = process_stream(&config(source.clone())).unwrap();

    assert_eq!(stream.state(), StreamState::Initialized);
    assert_eq!(source.read_calls(), 0);
}

#[tokio::test]
async fn publishes_pipeline_events_when_monitoring() {
    init_for_tests();
    let bus = TelemetryBus::new();
    let seen: Arc<Mutex<Vec<TelemetryEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(
        [event_names::PIPELINE_START, event_names::PIPELINE_STOP],
        Arc::new(move |e: &TelemetryEvent| sink.lock().push(e.clone())),
    );

    let cfg = config(grouped_source()).with_telemetry(bus.clone());
    let _: Vec<_> = process_stream(&cfg).unwrap().into_stream().collect().await;

    let mut quiet = config(grouped_source()).with_telemetry(bus);
    quiet.options.enable_monitoring = false;
    let _: Vec<_> = process_stream(&quiet).unwrap().into_stream().collect().await;

    let events = seen.lock().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name, event_names::PIPELINE_START);
    assert_eq!(events[1].measurement_u64("records_processed"), Some(5));
    assert_eq!(events[1].meta_str("report"), Some("sales"));
}
