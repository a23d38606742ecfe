use std::sync::Arc;

use serde_json::{Value, json};

use super::memory_source::compare_values;
use super::{DataSource, MemorySource, Query};
use crate::engine::errors::{SourceError, SourceErrorKind};
use crate::engine::types::Record;
use crate::test_helpers::factory::Factory;

fn source() -> MemorySource {
    let rows = vec![
        Factory::record().with("id", 1).with("region", "north").with("amount", 30).create(),
        Factory::record().with("id", 2).with("region", "south").with("amount", 10).create(),
        Factory::record().with("id", 3).with("region", "north").with("amount", 20).create(),
        Factory::record().with("id", 4).with("region", "south").with("amount", Value::Null).create(),
    ];
    MemorySource::new("memory").with_resource("sales", rows)
}

fn ids(records: &[Record]) -> Vec<i64> {
    records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}

async fn read(source: &MemorySource, query: Query) -> Vec<Record> {
    source.read(&query, None).await.unwrap().into_records()
}

#[tokio::test]
async fn filters_by_equality() {
    let records = read(&source(), Query::new("sales").with_filter("region", "north")).await;
    assert_eq!(ids(&records), vec![1, 3]);
}

#[tokio::test]
async fn sorts_on_several_fields() {
    let records = read(
        &source(),
        Query::new("sales").with_sort("region").with_sort("-amount"),
    )
    .await;
    assert_eq!(ids(&records), vec![1, 3, 2, 4]);
}

#[tokio::test]
async fn nulls_sort_first_ascending() {
    let records = read(&source(), Query::new("sales").with_sort("amount")).await;
    assert_eq!(ids(&records), vec![4, 2, 3, 1]);
}

#[tokio::test]
async fn pages_with_limit_and_offset() {
    let base = Query::new("sales").with_sort("id");
    let source = source();

    assert_eq!(ids(&read(&source, base.page(2, 0)).await), vec![1, 2]);
    assert_eq!(ids(&read(&source, base.page(2, 2)).await), vec![3, 4]);
    assert!(read(&source, base.page(2, 4)).await.is_empty());
}

#[tokio::test]
async fn unknown_resource_is_a_validation_error() {
    let err = source()
        .read(&Query::new("invoices"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::Validation);
}

#[tokio::test]
async fn relationships_go_through_registered_loaders() {
    let source = source().with_relationship(
        "owner",
        Arc::new(|records: Vec<Record>| {
            Ok(records
                .into_iter()
                .map(|mut r| {
                    r["owner"] = json!("ops");
                    r
                })
                .collect())
        }),
    );

    let loaded = source
        .load(read(&source, Query::new("sales")).await, "owner", None)
        .await
        .unwrap();
    assert!(loaded.iter().all(|r| r["owner"] == json!("ops")));

    let err: SourceError = source.load(Vec::new(), "manager", None).await.unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::Validation);
}

#[test]
fn lists_resources_sorted() {
    let source = source().with_resource("alpha", Vec::new());
    assert_eq!(source.resources(), vec!["alpha".to_string(), "sales".to_string()]);
    assert!(source.is_loaded());
    assert!(source.supports_read());
}

#[test]
fn value_ordering() {
    use std::cmp::Ordering::*;

    assert_eq!(compare_values(None, Some(&json!(1))), Less);
    assert_eq!(compare_values(Some(&Value::Null), None), Equal);
    assert_eq!(compare_values(Some(&json!(2.5)), Some(&json!(2))), Greater);
    assert_eq!(compare_values(Some(&json!(9)), Some(&json!("a"))), Less);
    assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Greater);
}
