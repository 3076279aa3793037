//! Orchestration admission objects.
//!
//! Accepts an array of objects, a `List`-style object with `items`, or an
//! admission review `{"request": {"object": {...}}}`. Addresses are
//! `<kind>/<namespace>/<name>`, with namespace `default` when absent. The
//! whole object is kept as attributes and `metadata.labels` become tags.

use super::{malformed, object, required_str, string_tags};
use infraguard_domain::ValidationError;
use infraguard_types::ResourceChange;
use serde_json::Value;

pub(crate) const DEFAULT_NAMESPACE: &str = "default";

pub(crate) fn normalize(doc: &Value) -> Result<Vec<ResourceChange>, ValidationError> {
    let mut objects: Vec<&Value> = Vec::new();
    collect(doc, &mut objects)?;
    objects
        .into_iter()
        .enumerate()
        .map(|(i, o)| entry(i, o))
        .collect()
}

fn collect<'a>(doc: &'a Value, out: &mut Vec<&'a Value>) -> Result<(), ValidationError> {
    match doc {
        Value::Array(items) => {
            for item in items {
                match item.get("items") {
                    Some(Value::Array(_)) => collect(item, out)?,
                    _ => out.push(item),
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            if let Some(request) = map.get("request") {
                let obj = request.get("object").ok_or_else(|| {
                    ValidationError::Document("admission request has no 'object'".to_string())
                })?;
                out.push(obj);
                return Ok(());
            }
            match map.get("items") {
                Some(Value::Array(items)) => out.extend(items.iter()),
                Some(_) => {
                    return Err(ValidationError::Document(
                        "'items' must be an array".to_string(),
                    ));
                }
                None => out.push(doc),
            }
            Ok(())
        }
        _ => Err(ValidationError::Document(
            "admission documents are an object or an array".to_string(),
        )),
    }
}

fn entry(index: usize, value: &Value) -> Result<ResourceChange, ValidationError> {
    let obj = object(index, value)?;
    let kind = required_str(index, obj, "kind")?;
    let metadata = match obj.get("metadata") {
        Some(Value::Object(m)) => m,
        Some(_) => return Err(malformed(index, "'metadata' must be an object")),
        None => return Err(malformed(index, "missing 'metadata'")),
    };
    let name = required_str(index, metadata, "name")?;
    let namespace = match metadata.get("namespace") {
        Some(Value::String(ns)) if !ns.is_empty() => ns.as_str(),
        _ => DEFAULT_NAMESPACE,
    };

    let mut r = ResourceChange::new(kind, format!("{kind}/{namespace}/{name}"));
    r.attributes = obj.clone();
    r.tags = string_tags(index, metadata.get("labels"))?;
    Ok(r)
}
