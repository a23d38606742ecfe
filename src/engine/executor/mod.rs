pub mod executor;
pub mod memory_source;
pub mod options;
pub mod query;
pub mod result;
pub mod source;
pub mod stream;

pub use executor::QueryExecutor;
pub use memory_source::{MemorySource, RelationshipLoader};
pub use options::{ExecuteOptions, PostProcess, ResultCaching};
pub use query::Query;
pub use result::{ExecutionMetadata, ExecutionResult};
pub use source::{DataSource, ReadOutput};
pub use stream::{QueryStream, RecordChunk};

#[cfg(test)]
mod memory_source_test;
