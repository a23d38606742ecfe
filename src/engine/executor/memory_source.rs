use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::errors::SourceError;
use crate::engine::types::{Actor, Record};

use super::query::Query;
use super::source::{DataSource, ReadOutput};

pub type RelationshipLoader =
    Arc<dyn Fn(Vec<Record>) -> Result<Vec<Record>, SourceError> + Send + Sync>;

/// Data source over in-memory record sets, keyed by resource name.
/// Supports equality filters, multi-field sorting and limit/offset paging.
#[derive(Clone, Default)]
pub struct MemorySource {
    name: String,
    resources: HashMap<String, Arc<Vec<Record>>>,
    relationships: HashMap<String, RelationshipLoader>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>, records: Vec<Record>) -> Self {
        self.resources.insert(resource.into(), Arc::new(records));
        self
    }

    pub fn with_relationship(mut self, name: impl Into<String>, loader: RelationshipLoader) -> Self {
        self.relationships.insert(name.into(), loader);
        self
    }

    fn select(&self, query: &Query) -> Result<Vec<Record>, SourceError> {
        let resource = query
            .resource()
            .ok_or_else(|| SourceError::validation("query has no resource"))?;
        let records = self.resources.get(resource).ok_or_else(|| {
            SourceError::validation(format!("unknown resource '{resource}' in '{}'", self.name))
        })?;

        let mut selected: Vec<&Record> = records
            .iter()
            .filter(|record| {
                query
                    .filter
                    .iter()
                    .all(|(field, expected)| record.get(field) == Some(expected))
            })
            .collect();

        if !query.sort.is_empty() {
            selected.sort_by(|a, b| compare_by_fields(a, b, &query.sort));
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(selected
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.resources.keys().cloned().collect();
        names.sort();
        names
    }

    async fn read(&self, query: &Query, _actor: Option<&Actor>) -> Result<ReadOutput, SourceError> {
        self.select(query).map(ReadOutput::Records)
    }

    async fn load(
        &self,
        records: Vec<Record>,
        relationship: &str,
        _actor: Option<&Actor>,
    ) -> Result<Vec<Record>, SourceError> {
        let loader = self.relationships.get(relationship).ok_or_else(|| {
            SourceError::validation(format!("unknown relationship '{relationship}'"))
        })?;
        loader(records)
    }
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySource")
            .field("name", &self.name)
            .field("resources", &self.resources())
            .finish()
    }
}

fn compare_by_fields(a: &Record, b: &Record, fields: &[String]) -> Ordering {
    for spec in fields {
        let (field, descending) = match spec.strip_prefix('-') {
            Some(f) => (f, true),
            None => (spec.as_str(), false),
        };
        let ord = compare_values(a.get(field), b.get(field));
        let ord = if descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Nulls/missing sort first, then numbers, then everything else by text.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Number(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Number(_))) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
