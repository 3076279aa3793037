//! Already-normalized documents: a JSON array of `{kind, address, attributes?, tags?}`.

use super::{object, optional_object, required_str, string_tags};
use infraguard_domain::ValidationError;
use infraguard_types::ResourceChange;
use serde_json::Value;

pub(crate) fn normalize(doc: &Value) -> Result<Vec<ResourceChange>, ValidationError> {
    let entries = doc.as_array().ok_or_else(|| {
        ValidationError::Document("native documents are a JSON array of resources".to_string())
    })?;
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| entry(i, e))
        .collect()
}

fn entry(index: usize, value: &Value) -> Result<ResourceChange, ValidationError> {
    let obj = object(index, value)?;
    let mut r = ResourceChange::new(
        required_str(index, obj, "kind")?,
        required_str(index, obj, "address")?,
    );
    r.attributes = optional_object(index, obj, "attributes")?;
    r.tags = string_tags(index, obj.get("tags"))?;
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_all_fields() {
        let out = normalize(&json!([{
            "kind": "storage-bucket",
            "address": "b1",
            "attributes": {"encryption": false},
            "tags": {"owner": "ops"}
        }]))
        .expect("normalize");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].address, "b1");
        assert_eq!(out[0].attributes["encryption"], json!(false));
        assert_eq!(out[0].tags.get("owner").map(String::as_str), Some("ops"));
    }

    #[test]
    fn attributes_and_tags_are_optional() {
        let out = normalize(&json!([{"kind": "network", "address": "vpc1", "tags": null}]))
            .expect("normalize");
        assert!(out[0].attributes.is_empty());
        assert!(out[0].tags.is_empty());
    }

    #[test]
    fn non_array_document_is_rejected() {
        assert!(matches!(
            normalize(&json!({"kind": "x"})),
            Err(ValidationError::Document(_))
        ));
    }

    #[test]
    fn missing_address_names_the_entry() {
        let err = normalize(&json!([{"kind": "x", "address": "a"}, {"kind": "x"}])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Malformed {
                index: 1,
                reason: "missing 'address'".to_string()
            }
        );
    }
}
