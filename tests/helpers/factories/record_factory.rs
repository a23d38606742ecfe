use serde_json::{Map, Value, json};

use crate::engine::types::Record;

/// Builds object records. Defaults: `{"id": 1, "region": "north", "amount": 10}`.
pub struct RecordFactory {
    fields: Map<String, Value>,
}

impl RecordFactory {
    pub fn new() -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), json!(1));
        fields.insert("region".into(), json!("north"));
        fields.insert("amount".into(), json!(10));
        Self { fields }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    pub fn create(self) -> Record {
        Value::Object(self.fields)
    }

    /// `count` records with `id` = 1..=count and `amount` = id * 10.
    pub fn create_list(self, count: usize) -> Vec<Record> {
        (1..=count)
            .map(|i| {
                let mut fields = self.fields.clone();
                fields.insert("id".into(), json!(i));
                fields.insert("amount".into(), json!(i * 10));
                Value::Object(fields)
            })
            .collect()
    }

    /// Like `create_list`, cycling `field` through `values` in runs of `run`.
    pub fn create_grouped(self, count: usize, field: &str, values: &[&str], run: usize) -> Vec<Record> {
        let run = run.max(1);
        let field = field.to_string();
        self.create_list(count)
            .into_iter()
            .enumerate()
            .map(|(i, mut record)| {
                let value = values[(i / run) % values.len()];
                if let Some(obj) = record.as_object_mut() {
                    obj.insert(field.clone(), json!(value));
                }
                record
            })
            .collect()
    }
}
