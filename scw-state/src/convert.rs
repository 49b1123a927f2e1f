//! Conversion between attribute values and their JSON form on disk

use std::collections::HashMap;

use scw_core::resource::Value;

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => {
            let obj: serde_json::Map<_, _> = map
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect();
            serde_json::Value::Object(obj)
        }
    }
}

/// Inverse of [`value_to_json`].
///
/// Returns `None` for `null`; floats are truncated to integers since the
/// attribute model has no fractional numbers.
pub fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Int(i)),
            None => n.as_f64().map(|f| Value::Int(f as i64)),
        },
        serde_json::Value::Array(items) => {
            Some(Value::List(items.iter().filter_map(json_to_value).collect()))
        }
        serde_json::Value::Object(map) => {
            let m: HashMap<_, _> = map
                .iter()
                .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
                .collect();
            Some(Value::Map(m))
        }
    }
}

pub fn attributes_to_json(
    attributes: &HashMap<String, Value>,
) -> HashMap<String, serde_json::Value> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect()
}

pub fn attributes_from_json(
    attributes: &HashMap<String, serde_json::Value>,
) -> HashMap<String, Value> {
    attributes
        .iter()
        .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
        .collect()
}
