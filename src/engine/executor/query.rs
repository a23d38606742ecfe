use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A prepared read against one resource of a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub resource: Option<String>,
    /// Equality filters, field -> expected value.
    #[serde(default)]
    pub filter: Map<String, Value>,
    /// Fields to sort by, ascending; prefix with `-` for descending.
    #[serde(default)]
    pub sort: Vec<String>,
    /// Relationships to load onto every returned record.
    #[serde(default)]
    pub relationships: Vec<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl Query {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filter.insert(field.to_string(), value.into());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>) -> Self {
        self.sort.push(field.into());
        self
    }

    pub fn with_relationships<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships = names.into_iter().map(Into::into).collect();
        self
    }

    /// Copy of this query bounded to one page.
    pub fn page(&self, limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
            ..self.clone()
        }
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }
}
