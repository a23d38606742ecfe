use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use crate::engine::pipeline::{GroupChange, VariableState};
use crate::engine::types::Record;

/// Variable state that logs every call and counts accepted records.
/// Log lines: `scope:<level>:<field>` and `update:<id>`.
pub struct RecordingVariables {
    log: Mutex<Vec<String>>,
    seen: Mutex<u64>,
    fail_on: Option<(String, Value)>,
    alive: AtomicBool,
}

impl RecordingVariables {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl VariableState for RecordingVariables {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn handle_scope_change(&self, change: &GroupChange) {
        self.log
            .lock()
            .push(format!("scope:{}:{}", change.level, change.field));
    }

    fn update_variables_ordered(&self, record: &Record) -> Result<(), String> {
        self.log.lock().push(format!("update:{}", record["id"]));
        if let Some((field, value)) = &self.fail_on {
            if record.get(field) == Some(value) {
                return Err(format!("rejected {field}={value}"));
            }
        }
        *self.seen.lock() += 1;
        Ok(())
    }

    fn get_all_values(&self) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("seen".into(), json!(*self.seen.lock()));
        values
    }
}

pub struct RecordingVariablesFactory {
    fail_on: Option<(String, Value)>,
}

impl RecordingVariablesFactory {
    pub fn new() -> Self {
        Self { fail_on: None }
    }

    /// Rejects records whose `field` equals `value`.
    pub fn failing_on(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fail_on = Some((field.to_string(), value.into()));
        self
    }

    pub fn create(self) -> RecordingVariables {
        RecordingVariables {
            log: Mutex::new(Vec::new()),
            seen: Mutex::new(0),
            fail_on: self.fail_on,
            alive: AtomicBool::new(true),
        }
    }
}
