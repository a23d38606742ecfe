use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use serde_json::Map;

use super::history::MetricHistory;
use super::metric::{ErrorMetric, PipelineMetric, QueryMetric};
use super::summary::{MEMORY_USAGE, PerformanceSummary, QUERY_DURATION, extract_series};
use super::window::TimeWindow;

const MB: u64 = 1024 * 1024;

fn t0() -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
}

fn queries() -> MetricHistory<QueryMetric> {
    let mut history = MetricHistory::new();
    let samples = [
        (0, 100, 10, Some(true), 64),
        (1, 300, 30, Some(false), 128),
        (2, 200, 5, None, 32),
    ];
    for (secs, ms, records, hit, mem) in samples {
        let mut metric =
            QueryMetric::new(Duration::from_millis(ms), records).with_memory_usage(mem * MB);
        metric.cache_hit = hit;
        history.record(t0() + TimeDelta::seconds(secs), metric, t0());
    }
    history
}

#[test]
fn summary_is_computed_from_the_given_samples_only() {
    let queries = queries();
    let mut pipelines = MetricHistory::new();
    pipelines.record(t0(), PipelineMetric::new(Duration::from_secs(1), 40, 16 * MB), t0());
    let mut errors = MetricHistory::new();
    errors.record(t0(), ErrorMetric::new("timeout", Map::new()), t0());
    errors.record(t0(), ErrorMetric::new("validation", Map::new()), t0());

    let summary = PerformanceSummary::build(
        TimeWindow::AllTime,
        queries.since(t0()),
        pipelines.since(t0()),
        errors.since(t0()),
    );

    assert_eq!(summary.total_queries, 3);
    assert_eq!(summary.total_records, 45);
    assert!((summary.avg_response_time_ms - 200.0).abs() < 1e-9);
    assert!((summary.peak_memory_mb - 128.0).abs() < 1e-9);
    assert!((summary.cache_efficiency - 0.5).abs() < 1e-9);
    assert_eq!(summary.error_count, 2);
    assert_eq!(summary.pipelines_processed, 1);
    assert_eq!(summary.pipeline_records, 40);
}

#[test]
fn empty_window_reports_zeroes() {
    let queries = queries();
    let pipelines = MetricHistory::<PipelineMetric>::new();
    let errors = MetricHistory::<ErrorMetric>::new();
    let late = t0() + TimeDelta::hours(1);

    let summary = PerformanceSummary::build(
        TimeWindow::LastMinute,
        queries.since(late),
        pipelines.since(late),
        errors.since(late),
    );

    assert_eq!(summary.total_queries, 0);
    assert_eq!(summary.avg_response_time_ms, 0.0);
    assert_eq!(summary.cache_efficiency, 0.0);
    assert_eq!(summary.peak_memory_mb, 0.0);
}

#[test]
fn extracts_duration_and_memory_series() {
    let queries = queries();

    let durations = extract_series(QUERY_DURATION, queries.since(t0()));
    let values: Vec<f64> = durations.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![100.0, 300.0, 200.0]);
    assert_eq!(durations[1].timestamp, t0() + TimeDelta::seconds(1));

    let memory = extract_series(MEMORY_USAGE, queries.since(t0()));
    let values: Vec<f64> = memory.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![64.0, 128.0, 32.0]);
}

#[test]
fn unknown_series_name_is_empty() {
    let queries = queries();
    assert!(extract_series("pipeline_duration", queries.since(t0())).is_empty());
    assert!(extract_series("", queries.since(t0())).is_empty());
}

#[test]
fn window_parsing_and_bounds() {
    assert_eq!("last_hour".parse::<TimeWindow>().unwrap(), TimeWindow::LastHour);
    assert_eq!("all_time".parse::<TimeWindow>().unwrap(), TimeWindow::AllTime);
    assert!("last_week".parse::<TimeWindow>().is_err());

    assert_eq!(TimeWindow::AllTime.start(t0()), None);
    assert_eq!(
        TimeWindow::LastMinute.start(t0()),
        Some(t0() - TimeDelta::minutes(1))
    );
    assert_eq!(TimeWindow::LastDay.to_string(), "last_day");
}
