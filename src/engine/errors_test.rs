use super::errors::{ExecutorError, PipelineError, SourceError, SourceErrorKind};
use std::time::Duration;

#[test]
fn timeouts_and_lost_workers_are_retryable() {
    assert!(ExecutorError::Timeout(Duration::from_millis(10)).is_retryable());
    assert!(
        ExecutorError::Source(SourceError::new(SourceErrorKind::ProcessExit, "gone")).is_retryable()
    );
    assert!(ExecutorError::Source(SourceError::other("connection reset")).is_retryable());
    assert!(ExecutorError::Unexpected("panic in driver".into()).is_retryable());
}

#[test]
fn domain_rejections_are_never_retried() {
    for kind in [
        SourceErrorKind::Validation,
        SourceErrorKind::Authorization,
        SourceErrorKind::Framework,
    ] {
        let err = ExecutorError::Source(SourceError::new(kind, "rejected"));
        assert!(!err.is_retryable(), "{kind:?} must not retry");
    }
    assert!(!ExecutorError::InvalidContext("no resource".into()).is_retryable());
}

#[test]
fn relationship_errors_follow_the_wrapped_classification() {
    let err = ExecutorError::Relationship {
        relationship: "customer".into(),
        source: SourceError::authorization("forbidden"),
    };
    assert!(!err.is_retryable());
    assert_eq!(err.kind_label(), "authorization");
    assert_eq!(
        err.to_string(),
        "Loading relationship 'customer' failed: Authorization: forbidden"
    );
}

#[test]
fn pipeline_error_labels_delegate_to_executor() {
    let err = PipelineError::from(ExecutorError::Timeout(Duration::from_secs(1)));
    assert_eq!(err.kind_label(), "timeout");
    assert_eq!(PipelineError::Variables("x".into()).kind_label(), "variables");
}
