use serde::Serialize;
use serde_json::{Map, Value};

use crate::engine::types::Record;

/// Group values currently in effect, threaded from one record to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupState {
    pub values: Map<String, Value>,
    pub records_seen: u64,
}

/// A break at one group level. Level 0 is the outermost group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupChange {
    pub level: usize,
    pub field: String,
    pub previous: Value,
    pub current: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub record: Record,
    pub group_changes: Vec<GroupChange>,
    pub group_values: Map<String, Value>,
    pub should_reset_variables: bool,
}

/// Detects group breaks. Must be fed records in arrival order: the state
/// returned for one record is the input for the next.
pub trait GroupProcessor: Send + Sync {
    fn initial_state(&self) -> GroupState;

    fn process_record(
        &self,
        state: &GroupState,
        record: Record,
    ) -> Result<(GroupState, GroupOutcome), String>;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Breaks on an ordered list of fields. A change at level `n` also breaks
/// every inner level, and the first record opens groups without a break.
#[derive(Debug, Clone, Default)]
pub struct FieldGroupProcessor {
    fields: Vec<String>,
}

impl FieldGroupProcessor {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl GroupProcessor for FieldGroupProcessor {
    fn initial_state(&self) -> GroupState {
        GroupState::default()
    }

    fn process_record(
        &self,
        state: &GroupState,
        record: Record,
    ) -> Result<(GroupState, GroupOutcome), String> {
        let object = record
            .as_object()
            .ok_or_else(|| "group processing expects object records".to_string())?;

        let mut values = Map::new();
        for field in &self.fields {
            values.insert(
                field.clone(),
                object.get(field).cloned().unwrap_or(Value::Null),
            );
        }

        let mut changes = Vec::new();
        if state.records_seen > 0 {
            let first_break = self
                .fields
                .iter()
                .position(|f| state.values.get(f) != values.get(f));
            if let Some(start) = first_break {
                for (level, field) in self.fields.iter().enumerate().skip(start) {
                    changes.push(GroupChange {
                        level,
                        field: field.clone(),
                        previous: state.values.get(field).cloned().unwrap_or(Value::Null),
                        current: values.get(field).cloned().unwrap_or(Value::Null),
                    });
                }
            }
        }

        let next = GroupState {
            values: values.clone(),
            records_seen: state.records_seen + 1,
        };
        let outcome = GroupOutcome {
            should_reset_variables: !changes.is_empty(),
            record,
            group_changes: changes,
            group_values: values,
        };
        Ok((next, outcome))
    }

    fn validate(&self) -> Result<(), String> {
        if self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err("group processor has an empty field name".to_string());
        }
        Ok(())
    }
}
