use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use crate::engine::executor::memory_source::compare_values;
use crate::engine::types::Record;

use super::group::GroupChange;

/// External variable accumulator. Calls arrive in record order; scope
/// changes for a record are always delivered before that record's update.
pub trait VariableState: Send + Sync {
    /// A handle whose owner has gone away must report false.
    fn is_alive(&self) -> bool {
        true
    }

    fn handle_scope_change(&self, change: &GroupChange);

    fn update_variables_ordered(&self, record: &Record) -> Result<(), String>;

    fn get_all_values(&self) -> Map<String, Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Sum,
    Count,
    Average,
    Min,
    Max,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Accumulates across the whole report.
    Report,
    /// Resets whenever the group at this level (or an outer one) breaks.
    Group(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub field: String,
    pub kind: VariableKind,
    pub reset: ResetScope,
}

impl VariableSpec {
    pub fn new(name: &str, field: &str, kind: VariableKind, reset: ResetScope) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
            kind,
            reset,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    sum: f64,
    count: u64,
    numeric: u64,
    min: Option<Value>,
    max: Option<Value>,
    first: Option<Value>,
    last: Option<Value>,
}

impl Accumulator {
    fn add(&mut self, value: Option<&Value>) {
        self.count += 1;
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return;
        };
        if let Some(n) = value.as_f64() {
            self.sum += n;
            self.numeric += 1;
        }
        if self.first.is_none() {
            self.first = Some(value.clone());
        }
        self.last = Some(value.clone());
        if self
            .min
            .as_ref()
            .is_none_or(|m| compare_values(Some(value), Some(m)).is_lt())
        {
            self.min = Some(value.clone());
        }
        if self
            .max
            .as_ref()
            .is_none_or(|m| compare_values(Some(value), Some(m)).is_gt())
        {
            self.max = Some(value.clone());
        }
    }

    fn value(&self, kind: VariableKind) -> Value {
        match kind {
            VariableKind::Sum => json!(self.sum),
            VariableKind::Count => json!(self.count),
            VariableKind::Average if self.numeric == 0 => Value::Null,
            VariableKind::Average => json!(self.sum / self.numeric as f64),
            VariableKind::Min => self.min.clone().unwrap_or(Value::Null),
            VariableKind::Max => self.max.clone().unwrap_or(Value::Null),
            VariableKind::First => self.first.clone().unwrap_or(Value::Null),
            VariableKind::Last => self.last.clone().unwrap_or(Value::Null),
        }
    }
}

/// In-process `VariableState` with group-scoped resets.
#[derive(Debug)]
pub struct RunningVariables {
    specs: Vec<VariableSpec>,
    state: Mutex<Vec<Accumulator>>,
    alive: AtomicBool,
}

impl RunningVariables {
    pub fn new(specs: Vec<VariableSpec>) -> Self {
        let state = vec![Accumulator::default(); specs.len()];
        Self {
            specs,
            state: Mutex::new(state),
            alive: AtomicBool::new(true),
        }
    }

    /// Marks the handle dead; pipelines will refuse it from now on.
    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl VariableState for RunningVariables {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn handle_scope_change(&self, change: &GroupChange) {
        let mut state = self.state.lock();
        for (spec, acc) in self.specs.iter().zip(state.iter_mut()) {
            if let ResetScope::Group(level) = spec.reset {
                if change.level <= level {
                    *acc = Accumulator::default();
                }
            }
        }
    }

    fn update_variables_ordered(&self, record: &Record) -> Result<(), String> {
        let object = record
            .as_object()
            .ok_or_else(|| "variables expect object records".to_string())?;
        // Reject the whole record before touching any accumulator.
        for spec in &self.specs {
            if !matches!(spec.kind, VariableKind::Sum | VariableKind::Average) {
                continue;
            }
            if let Some(v) = object.get(&spec.field).filter(|v| !v.is_null() && !v.is_number()) {
                return Err(format!(
                    "variable '{}' expects a number in '{}', got {}",
                    spec.name, spec.field, v
                ));
            }
        }

        let mut state = self.state.lock();
        for (spec, acc) in self.specs.iter().zip(state.iter_mut()) {
            acc.add(object.get(&spec.field));
        }
        Ok(())
    }

    fn get_all_values(&self) -> Map<String, Value> {
        let state = self.state.lock();
        self.specs
            .iter()
            .zip(state.iter())
            .map(|(spec, acc)| (spec.name.clone(), acc.value(spec.kind)))
            .collect()
    }
}
