//! Deep merge for option-like JSON objects
//!
//! Nested objects merge key-by-key; any other value (arrays included)
//! replaces what was there. Later sources always win on conflicts.

use serde_json::{Map, Value};

/// Merge `source` into `target` in place
pub fn merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Merge any number of maps into a fresh map, least specific first
pub fn merge_all<'a, I>(sources: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut merged = Map::new();
    for source in sources {
        merge(&mut merged, source);
    }
    merged
}
