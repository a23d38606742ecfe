use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single row as returned by a data source.
pub type Record = Value;

/// Report parameters; keys are unordered.
pub type Params = Map<String, Value>;

/// Opaque caller identity forwarded to collaborators. This core never
/// inspects it beyond its id, which participates in cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }
}

/// Rough in-memory footprint of a value, used by cache memory accounting
/// and pipeline memory bounds.
pub trait SizeEstimate {
    fn estimated_size(&self) -> usize;
}

impl SizeEstimate for Value {
    fn estimated_size(&self) -> usize {
        match self {
            Value::Null | Value::Bool(_) => 8,
            Value::Number(_) => 16,
            Value::String(s) => 24 + s.len(),
            Value::Array(items) => 24 + items.iter().map(|v| v.estimated_size()).sum::<usize>(),
            Value::Object(map) => {
                48 + map
                    .iter()
                    .map(|(k, v)| 24 + k.len() + v.estimated_size())
                    .sum::<usize>()
            }
        }
    }
}

impl SizeEstimate for String {
    fn estimated_size(&self) -> usize {
        24 + self.len()
    }
}

impl<T: SizeEstimate> SizeEstimate for Vec<T> {
    fn estimated_size(&self) -> usize {
        24 + self.iter().map(|v| v.estimated_size()).sum::<usize>()
    }
}

impl<T: SizeEstimate> SizeEstimate for std::sync::Arc<T> {
    fn estimated_size(&self) -> usize {
        self.as_ref().estimated_size()
    }
}
