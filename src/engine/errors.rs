use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Classification reported by data-source collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Timeout,
    /// The backing worker or connection went away mid-call.
    ProcessExit,
    Validation,
    Authorization,
    /// Rejected by the data framework itself (bad filter, unknown field, ...).
    Framework,
    Other,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Other, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Validation, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Authorization, message)
    }
}

/// Errors that can occur while executing a query against a data source.
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    #[error("Loading relationship '{relationship}' failed: {source}")]
    Relationship {
        relationship: String,
        source: SourceError,
    },

    #[error("Invalid execution context: {0}")]
    InvalidContext(String),

    #[error("Unexpected execution failure: {0}")]
    Unexpected(String),
}

impl ExecutorError {
    /// Timeouts, lost workers and anything not explicitly flagged as a
    /// domain rejection are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutorError::Timeout(_) => true,
            ExecutorError::Source(e) | ExecutorError::Relationship { source: e, .. } => {
                !matches!(
                    e.kind,
                    SourceErrorKind::Validation
                        | SourceErrorKind::Authorization
                        | SourceErrorKind::Framework
                )
            }
            ExecutorError::InvalidContext(_) => false,
            ExecutorError::Unexpected(_) => true,
        }
    }

    /// Short machine-friendly label used as the monitor's error type.
    pub fn kind_label(&self) -> &'static str {
        match self {
            ExecutorError::Timeout(_) => "timeout",
            ExecutorError::Source(e) | ExecutorError::Relationship { source: e, .. } => {
                match e.kind {
                    SourceErrorKind::Timeout => "timeout",
                    SourceErrorKind::ProcessExit => "process_exit",
                    SourceErrorKind::Validation => "validation",
                    SourceErrorKind::Authorization => "authorization",
                    SourceErrorKind::Framework => "framework",
                    SourceErrorKind::Other => "source",
                }
            }
            ExecutorError::InvalidContext(_) => "invalid_context",
            ExecutorError::Unexpected(_) => "unexpected",
        }
    }

    pub fn log_error(&self) {
        match self {
            ExecutorError::Timeout(after) => {
                error!("Query timed out after {:?}", after);
            }
            ExecutorError::Source(e) => {
                error!("Data source error: {}", e);
                debug!("Data source error details: {:?}", e);
            }
            ExecutorError::Relationship {
                relationship,
                source,
            } => {
                error!("Relationship '{}' failed to load: {}", relationship, source);
                debug!("Relationship error details: {:?}", source);
            }
            ExecutorError::InvalidContext(msg) => {
                error!("Invalid execution context: {}", msg);
            }
            ExecutorError::Unexpected(msg) => {
                error!("Unexpected execution failure: {}", msg);
            }
        }
    }
}

/// Errors surfaced by pipeline runs, either up front or inline per record.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Invalid pipeline configuration: {0}")]
    Config(String),

    #[error("Query build failed: {0}")]
    QueryBuild(String),

    #[error("Execution failed: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Group processing failed: {0}")]
    Group(String),

    #[error("Variable update failed: {0}")]
    Variables(String),

    #[error("Pipeline run exceeded its timeout of {0:?}")]
    Timeout(Duration),

    #[error("Memory budget exceeded: {0}")]
    Memory(String),

    #[error("Unexpected pipeline failure: {0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn kind_label(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::QueryBuild(_) => "query_build",
            PipelineError::Executor(e) => e.kind_label(),
            PipelineError::Group(_) => "group",
            PipelineError::Variables(_) => "variables",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::Memory(_) => "memory",
            PipelineError::Unexpected(_) => "unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("Unknown time window '{0}'")]
    UnknownWindow(String),

    #[error("Monitor worker is not running")]
    Unavailable,
}
