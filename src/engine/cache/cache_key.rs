use std::fmt;

use serde_json::{Value, json};

use crate::engine::types::Params;
use crate::shared::hash::stable_json_hash;

#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Child key scoped under this one, e.g. one chunk of a streamed result.
    pub fn derive(&self, suffix: impl fmt::Display) -> Self {
        Self(format!("{}#{}", self.0, suffix))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Builds a stable key for a report request. Parameter maps are hashed in
/// canonical (sorted-key) form, so equal requests collide regardless of the
/// order their params were inserted in.
pub fn build_key(
    report: &str,
    params: &Params,
    operation: &str,
    extra: Option<&Value>,
    actor_id: Option<&str>,
) -> CacheKey {
    let composite = json!({
        "report": report,
        "params": Value::Object(params.clone()),
        "operation": operation,
        "extra": extra.cloned().unwrap_or(Value::Null),
        "actor": actor_id,
    });
    let digest = stable_json_hash(&composite);
    CacheKey(format!("{report}:{operation}:{digest:016x}"))
}
