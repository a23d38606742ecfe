use async_trait::async_trait;

use crate::engine::errors::SourceError;
use crate::engine::types::{Actor, Record};

use super::query::Query;

/// Shapes a data source may answer a read with.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutput {
    Records(Vec<Record>),
    Page { results: Vec<Record> },
}

impl ReadOutput {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            ReadOutput::Records(records) => records,
            ReadOutput::Page { results } => results,
        }
    }
}

/// External domain/data-source collaborator. The actor is forwarded untouched.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the source finished initialising and can serve calls.
    fn is_loaded(&self) -> bool {
        true
    }

    fn supports_read(&self) -> bool {
        true
    }

    fn resources(&self) -> Vec<String>;

    async fn read(&self, query: &Query, actor: Option<&Actor>) -> Result<ReadOutput, SourceError>;

    /// Loads `relationship` onto each record, returning them in the same order.
    async fn load(
        &self,
        records: Vec<Record>,
        relationship: &str,
        actor: Option<&Actor>,
    ) -> Result<Vec<Record>, SourceError>;
}
