use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Well-known event names published by the loader components.
pub mod event_names {
    pub const QUERY_START: &str = "query.start";
    pub const QUERY_STOP: &str = "query.stop";
    pub const CACHE_HIT: &str = "cache.hit";
    pub const CACHE_MISS: &str = "cache.miss";
    pub const PIPELINE_START: &str = "pipeline.start";
    pub const PIPELINE_STOP: &str = "pipeline.stop";
    pub const ERROR: &str = "error";

    pub const ALL: [&str; 7] = [
        QUERY_START,
        QUERY_STOP,
        CACHE_HIT,
        CACHE_MISS,
        PIPELINE_START,
        PIPELINE_STOP,
        ERROR,
    ];
}

/// A named event with numeric measurements and free-form metadata.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub name: String,
    pub at: DateTime<Utc>,
    pub measurements: Map<String, Value>,
    pub metadata: Map<String, Value>,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            at: Utc::now(),
            measurements: Map::new(),
            metadata: Map::new(),
        }
    }

    pub fn measure(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.measurements.insert(key.to_string(), value.into());
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn measurement_f64(&self, key: &str) -> Option<f64> {
        self.measurements.get(key).and_then(Value::as_f64)
    }

    pub fn measurement_u64(&self, key: &str) -> Option<u64> {
        self.measurements.get(key).and_then(Value::as_u64)
    }

    pub fn meta_bool(&self, key: &str) -> Option<bool> {
        self.metadata.get(key).and_then(Value::as_bool)
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}
