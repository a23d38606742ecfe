use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Deterministic 64-bit hash for cache keys.
/// FxHasher has no per-process seed, so equal inputs hash equally across runs.
pub fn stable_hash64<T: Hash>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hashes the canonical JSON text of a value. Object keys are emitted in
/// sorted order, so logically equal maps hash identically.
pub fn stable_json_hash(value: &serde_json::Value) -> u64 {
    stable_hash64(&canonical_json(value))
}

pub fn canonical_json(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        Value::String(k.clone()),
                        canonical_json(&map[k.as_str()])
                    )
                })
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{canonical_json, stable_hash64, stable_json_hash};
    use serde_json::json;

    #[test]
    fn stable_hash64_is_deterministic() {
        let a = stable_hash64(&"apple");
        let b = stable_hash64(&"apple");
        assert_eq!(a, b);
        assert_ne!(a, stable_hash64(&"banana"));
    }

    #[test]
    fn nested_objects_are_sorted() {
        let value = json!({"b": {"y": 1, "x": [2, {"d": 1, "c": 0}]}, "a": null});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":null,"b":{"x":[2,{"c":0,"d":1}],"y":1}}"#
        );
    }

    #[test]
    fn array_order_is_significant() {
        assert_ne!(
            stable_json_hash(&json!([1, 2])),
            stable_json_hash(&json!([2, 1]))
        );
    }
}
