//! Plan-style change sets.
//!
//! Accepts `{"resource_changes": [...]}` or a bare array of entries shaped
//! `{address, type, change: {actions, after}}`. The proposed state (`after`)
//! becomes the attributes; a deleted resource has no `after` and normalizes
//! to empty attributes. Planned actions are kept under `attributes.__actions`.
//! Tags come from `after.tags_all`, overridden by `after.tags`.

use super::{malformed, object, optional_object, required_str, string_tags};
use infraguard_domain::ValidationError;
use infraguard_types::ResourceChange;
use serde_json::Value;

pub(crate) const ACTIONS_KEY: &str = "__actions";

pub(crate) fn normalize(doc: &Value) -> Result<Vec<ResourceChange>, ValidationError> {
    let entries = match doc {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("resource_changes") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ValidationError::Document(
                    "'resource_changes' must be an array".to_string(),
                ));
            }
            None => {
                return Err(ValidationError::Document(
                    "plan documents need a 'resource_changes' array".to_string(),
                ));
            }
        },
        _ => {
            return Err(ValidationError::Document(
                "plan documents are an object or an array".to_string(),
            ));
        }
    };
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| entry(i, e))
        .collect()
}

fn entry(index: usize, value: &Value) -> Result<ResourceChange, ValidationError> {
    let obj = object(index, value)?;
    let address = required_str(index, obj, "address")?;
    let kind = required_str(index, obj, "type")?;
    let change = optional_object(index, obj, "change")?;

    let actions = match change.get("actions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(malformed(index, "'change.actions' must be an array")),
    };
    let after = optional_object(index, &change, "after")?;

    let mut tags = string_tags(index, after.get("tags_all"))?;
    tags.extend(string_tags(index, after.get("tags"))?);

    let mut r = ResourceChange::new(kind, address);
    r.attributes = after;
    r.attributes
        .insert(ACTIONS_KEY.to_string(), Value::Array(actions));
    r.tags = tags;
    Ok(r)
}
