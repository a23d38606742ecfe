use std::sync::Arc;

use futures::Stream;
use tracing::debug;

use crate::engine::errors::ExecutorError;
use crate::engine::types::Record;

use super::executor::QueryExecutor;
use super::options::ExecuteOptions;
use super::query::Query;
use super::source::DataSource;

const LOG_TARGET: &str = "engine::executor::stream";

/// One page of a streamed query.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChunk {
    pub records: Vec<Record>,
    pub offset: usize,
    pub cache_hit: bool,
}

impl RecordChunk {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Offset cursor over a query. Each pull issues exactly one bounded
/// `execute_query`; nothing is fetched ahead of the caller. A short page
/// ends the cursor, an error is yielded once as the last item. The cursor
/// cannot be rewound.
pub struct QueryStream {
    executor: QueryExecutor,
    query: Query,
    source: Arc<dyn DataSource>,
    options: ExecuteOptions,
    chunk_size: usize,
    offset: usize,
    finished: bool,
}

impl QueryStream {
    pub(super) fn new(
        executor: QueryExecutor,
        query: Query,
        source: Arc<dyn DataSource>,
        options: ExecuteOptions,
        chunk_size: usize,
    ) -> Self {
        Self {
            executor,
            query,
            source,
            options,
            chunk_size: chunk_size.max(1),
            offset: 0,
            finished: false,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub async fn next_chunk(&mut self) -> Option<Result<RecordChunk, ExecutorError>> {
        if self.finished {
            return None;
        }

        let page = self.query.page(self.chunk_size, self.offset);
        let mut options = self.options.clone();
        if let Some(caching) = options.caching.as_mut() {
            caching.key = caching.key.derive(self.offset);
        }

        match self
            .executor
            .execute_query(&page, self.source.as_ref(), &options)
            .await
        {
            Ok(result) => {
                let chunk = RecordChunk {
                    offset: self.offset,
                    cache_hit: result.metadata.cache_hit,
                    records: result.records,
                };
                self.offset += chunk.len();
                if chunk.len() < self.chunk_size {
                    self.finished = true;
                }
                debug!(
                    target: LOG_TARGET,
                    offset = chunk.offset,
                    records = chunk.len(),
                    finished = self.finished,
                    "Chunk fetched"
                );
                Some(Ok(chunk))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<RecordChunk, ExecutorError>> + Send {
        futures::stream::unfold(self, |mut cursor| async move {
            let item = cursor.next_chunk().await?;
            Some((item, cursor))
        })
    }
}

impl std::fmt::Debug for QueryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStream")
            .field("resource", &self.query.resource)
            .field("chunk_size", &self.chunk_size)
            .field("offset", &self.offset)
            .field("finished", &self.finished)
            .finish()
    }
}
