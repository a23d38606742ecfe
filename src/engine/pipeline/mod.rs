pub mod config;
pub mod group;
pub mod query_builder;
pub mod report;
pub mod result;
pub mod runner;
pub mod stream;
pub mod variables;

pub use config::{PipelineConfig, PipelineOptions};
pub use group::{FieldGroupProcessor, GroupChange, GroupOutcome, GroupProcessor, GroupState};
pub use query_builder::{BuildOptions, QueryBuilder, ReportQueryBuilder};
pub use report::Report;
pub use result::{PipelineResult, PipelineSummary, ProcessingMetadata, ProcessingResult};
pub use runner::{
    ProcessingTransform, create_custom_pipeline, process_all, process_stream, validate_config,
};
pub use stream::{ProcessingStream, StreamState};
pub use variables::{ResetScope, RunningVariables, VariableKind, VariableSpec, VariableState};

#[cfg(test)]
mod group_test;
#[cfg(test)]
mod stream_test;
#[cfg(test)]
mod variables_test;
