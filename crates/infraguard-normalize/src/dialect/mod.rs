pub(crate) mod admission;
pub(crate) mod build;
pub(crate) mod native;
pub(crate) mod plan;

use infraguard_domain::ValidationError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> ValidationError {
    ValidationError::Malformed {
        index,
        reason: reason.into(),
    }
}

pub(crate) fn object(index: usize, value: &Value) -> Result<&Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| malformed(index, "expected an object"))
}

pub(crate) fn required_str<'a>(
    index: usize,
    map: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ValidationError> {
    match map.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(malformed(index, format!("'{key}' must not be empty"))),
        Some(_) => Err(malformed(index, format!("'{key}' must be a string"))),
        None => Err(malformed(index, format!("missing '{key}'"))),
    }
}

/// Optional object field; null and missing both read as empty.
pub(crate) fn optional_object(
    index: usize,
    map: &Map<String, Value>,
    key: &str,
) -> Result<Map<String, Value>, ValidationError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(m)) => Ok(m.clone()),
        Some(_) => Err(malformed(index, format!("'{key}' must be an object"))),
    }
}

/// String-valued tag map. Scalars are stringified, a null value becomes an empty string,
/// structured values are rejected.
pub(crate) fn string_tags(
    index: usize,
    value: Option<&Value>,
) -> Result<BTreeMap<String, String>, ValidationError> {
    let map = match value {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(m)) => m,
        Some(_) => return Err(malformed(index, "tags must be an object")),
    };
    let mut tags = BTreeMap::new();
    for (k, v) in map {
        let text = match v {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(malformed(index, format!("tag '{k}' must be a scalar")));
            }
        };
        tags.insert(k.clone(), text);
    }
    Ok(tags)
}
