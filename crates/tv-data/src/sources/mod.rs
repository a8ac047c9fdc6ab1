//! Document store backends
//!
//! Each backend implements [`tv_core::ConnectionPort`].

pub mod memory_store;
#[cfg(any(test, feature = "test-util"))]
pub mod recording;
pub mod sqlite_store;

pub use memory_store::MemoryDocumentStore;
#[cfg(any(test, feature = "test-util"))]
pub use recording::{PortCall, RecordingPort};
pub use sqlite_store::SqliteDocumentStore;

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

/// Resolve a dotted path (`params.position`) inside a JSON document
pub(crate) fn lookup_path<'a>(document: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

/// Top-level keys of a document, `_id` excluded. An embedded document
/// contributes its own keys as `parent.child` instead of itself.
pub(crate) fn document_keys(document: &JsonValue) -> Vec<String> {
    let Some(object) = document.as_object() else {
        return Vec::new();
    };

    let mut keys = Vec::new();
    for (key, value) in object {
        if key == "_id" {
            continue;
        }
        match value.as_object() {
            Some(nested) => keys.extend(nested.keys().map(|sub| format!("{}.{}", key, sub))),
            None => keys.push(key.clone()),
        }
    }
    keys
}

/// Ordering used by sorted fetches: missing < null < numbers < strings <
/// everything else, then by value.
pub(crate) fn compare_json(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    fn rank(value: Option<&JsonValue>) -> u8 {
        match value {
            None => 0,
            Some(JsonValue::Null) => 1,
            Some(JsonValue::Number(_)) => 2,
            Some(JsonValue::String(_)) => 3,
            Some(JsonValue::Bool(_)) => 4,
            Some(JsonValue::Array(_)) | Some(JsonValue::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_path() {
        let doc = json!({"params": {"position": "1 2 3", "level_key": "forest"}, "fps": 60});
        assert_eq!(lookup_path(&doc, "params.position"), Some(&json!("1 2 3")));
        assert_eq!(lookup_path(&doc, "fps"), Some(&json!(60)));
        assert_eq!(lookup_path(&doc, "params.missing"), None);
        assert_eq!(lookup_path(&doc, "fps.deeper"), None);
    }

    #[test]
    fn test_keys_flatten_one_level() {
        let doc = json!({"_id": 1, "time": 3, "params": {"position": "", "health": 10}});
        let mut keys = document_keys(&doc);
        keys.sort();
        assert_eq!(keys, vec!["params.health", "params.position", "time"]);
    }

    #[test]
    fn test_missing_sorts_first() {
        let one = json!(1);
        let text = json!("a");
        assert_eq!(compare_json(None, Some(&one)), Ordering::Less);
        assert_eq!(compare_json(Some(&one), Some(&text)), Ordering::Less);
        assert_eq!(compare_json(Some(&json!(2.5)), Some(&one)), Ordering::Greater);
    }
}
