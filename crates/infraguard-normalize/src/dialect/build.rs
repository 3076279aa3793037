//! Parsed container build instructions.
//!
//! A document is a list of instruction objects `{cmd, value, flags?, stage?}`.
//! The input is either one flat document or an array of documents. Each
//! document becomes one `container-build` resource addressed
//! `container-build/<index>` with attributes:
//!
//! ```json
//! { "instructions": [{"cmd": "FROM", "value": ["alpine:3.20"], "flags": [], "stage": 0}],
//!   "stages": 1 }
//! ```
//!
//! `cmd` is upper-cased, `value` is always a list of strings, and `stage`
//! counts `FROM` instructions when the parser did not supply it.

use super::{malformed, object};
use infraguard_domain::ValidationError;
use infraguard_types::ResourceChange;
use infraguard_types::ids::KIND_CONTAINER_BUILD;
use serde_json::{Map, Value, json};

pub(crate) fn normalize(doc: &Value) -> Result<Vec<ResourceChange>, ValidationError> {
    let items = doc.as_array().ok_or_else(|| {
        ValidationError::Document("build documents are a JSON array".to_string())
    })?;

    let documents: Vec<&[Value]> = if items.iter().all(Value::is_array) {
        items
            .iter()
            .filter_map(|d| d.as_array().map(Vec::as_slice))
            .collect()
    } else if items.iter().all(Value::is_object) {
        vec![items.as_slice()]
    } else {
        return Err(ValidationError::Document(
            "build documents mix instruction lists and instructions".to_string(),
        ));
    };

    documents
        .into_iter()
        .enumerate()
        .map(|(i, d)| document(i, d))
        .collect()
}

fn document(index: usize, instructions: &[Value]) -> Result<ResourceChange, ValidationError> {
    let mut out = Vec::with_capacity(instructions.len());
    let mut stages: i64 = 0;

    for (n, raw) in instructions.iter().enumerate() {
        let obj = object(index, raw)?;
        let cmd = match obj.get("cmd") {
            Some(Value::String(c)) if !c.trim().is_empty() => c.trim().to_ascii_uppercase(),
            _ => return Err(malformed(index, format!("instruction {n} has no 'cmd'"))),
        };
        if cmd == "FROM" {
            stages += 1;
        }
        let value = string_list(obj.get("value"))
            .ok_or_else(|| malformed(index, format!("instruction {n} has a non-string 'value'")))?;
        let flags = string_list(obj.get("flags"))
            .ok_or_else(|| malformed(index, format!("instruction {n} has non-string 'flags'")))?;
        let stage = match obj.get("stage").and_then(Value::as_i64) {
            Some(s) => s,
            None => (stages - 1).max(0),
        };

        let mut instruction = Map::new();
        instruction.insert("cmd".to_string(), Value::String(cmd));
        instruction.insert("value".to_string(), json!(value));
        instruction.insert("flags".to_string(), json!(flags));
        instruction.insert("stage".to_string(), json!(stage));
        out.push(Value::Object(instruction));
    }

    let mut r = ResourceChange::new(KIND_CONTAINER_BUILD, format!("{KIND_CONTAINER_BUILD}/{index}"));
    r.attributes
        .insert("instructions".to_string(), Value::Array(out));
    r.attributes.insert("stages".to_string(), json!(stages));
    Ok(r)
}

/// `None` when the value is neither a string nor a list of strings.
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::String(s)) => Some(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_document_is_one_resource() {
        let out = normalize(&json!([
            {"cmd": "from", "value": ["golang:1.22"]},
            {"cmd": "RUN", "value": "go build"},
            {"cmd": "FROM", "value": ["alpine:latest"], "flags": ["--platform=linux/amd64"]},
            {"cmd": "USER", "value": ["root"]}
        ]))
        .expect("normalize");

        assert_eq!(out.len(), 1);
        let r = &out[0];
        assert_eq!(r.kind, KIND_CONTAINER_BUILD);
        assert_eq!(r.address, "container-build/0");
        assert_eq!(r.attributes["stages"], json!(2));
        let instructions = r.attributes["instructions"].as_array().expect("array");
        assert_eq!(instructions[0]["cmd"], json!("FROM"));
        assert_eq!(instructions[1]["value"], json!(["go build"]));
        assert_eq!(instructions[1]["stage"], json!(0));
        assert_eq!(instructions[3]["stage"], json!(1));
        assert_eq!(instructions[2]["flags"], json!(["--platform=linux/amd64"]));
    }

    #[test]
    fn array_of_documents_gives_one_resource_each() {
        let out = normalize(&json!([
            [{"cmd": "FROM", "value": ["a"]}],
            [{"cmd": "FROM", "value": ["b"]}]
        ]))
        .expect("normalize");
        let addresses: Vec<&str> = out.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["container-build/0", "container-build/1"]);
    }

    #[test]
    fn instruction_without_cmd_is_malformed() {
        let err = normalize(&json!([{"value": ["x"]}])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Malformed {
                index: 0,
                reason: "instruction 0 has no 'cmd'".to_string()
            }
        );
    }

    #[test]
    fn mixed_shapes_are_rejected() {
        assert!(matches!(
            normalize(&json!([[], {"cmd": "FROM"}])),
            Err(ValidationError::Document(_))
        ));
    }
}
