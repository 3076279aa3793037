//! Resource Model Normalizer: external change documents -> `ResourceChange[]`.
//!
//! Pure transformations, no IO. Each dialect maps one document shape onto the
//! uniform `{kind, address, attributes, tags}` model; kinds are never
//! interpreted here, so unknown kinds pass through untouched.

#![forbid(unsafe_code)]

mod dialect;

use dialect::{admission, build, native, plan};
use infraguard_domain::ValidationError;
use infraguard_types::{Dialect, ResourceChange};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Normalize a parsed document in the given dialect.
///
/// Fails with [`ValidationError::DuplicateAddress`] naming both entries when
/// two resources end up with the same address.
pub fn normalize(doc: &Value, dialect: Dialect) -> Result<Vec<ResourceChange>, ValidationError> {
    let resources = match dialect {
        Dialect::Native => native::normalize(doc)?,
        Dialect::Plan => plan::normalize(doc)?,
        Dialect::Admission => admission::normalize(doc)?,
        Dialect::Build => build::normalize(doc)?,
    };
    ensure_unique_addresses(&resources)?;
    debug!(%dialect, resources = resources.len(), "normalized change document");
    Ok(resources)
}

/// Parse JSON text and normalize it.
pub fn normalize_str(text: &str, dialect: Dialect) -> Result<Vec<ResourceChange>, ValidationError> {
    let doc: Value =
        serde_json::from_str(text).map_err(|e| ValidationError::Document(e.to_string()))?;
    normalize(&doc, dialect)
}

pub fn ensure_unique_addresses(resources: &[ResourceChange]) -> Result<(), ValidationError> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, r) in resources.iter().enumerate() {
        if let Some(&first) = seen.get(r.address.as_str()) {
            return Err(ValidationError::DuplicateAddress {
                address: r.address.clone(),
                first,
                second: i,
            });
        }
        seen.insert(r.address.as_str(), i);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn duplicate_addresses_are_rejected_with_both_indices() {
        let doc = json!([
            {"kind": "network", "address": "vpc1"},
            {"kind": "flow-log", "address": "fl1"},
            {"kind": "network", "address": "vpc1"}
        ]);
        let err = normalize(&doc, Dialect::Native).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateAddress {
                address: "vpc1".to_string(),
                first: 0,
                second: 2,
            }
        );
    }

    #[test]
    fn invalid_json_text_is_a_document_error() {
        let err = normalize_str("[{", Dialect::Native).unwrap_err();
        assert!(matches!(err, ValidationError::Document(_)));
    }

    #[test]
    fn unknown_kinds_pass_through() {
        let resources = normalize_str(
            r#"[{"kind": "quantum-tunnel", "address": "qt1", "attributes": {"x": 1}}]"#,
            Dialect::Native,
        )
        .expect("normalize");
        assert_eq!(resources[0].kind, "quantum-tunnel");
        assert_eq!(resources[0].attributes["x"], json!(1));
    }

    proptest! {
        #[test]
        fn native_keeps_every_entry(addresses in prop::collection::btree_set("[a-z]{1,8}", 0..16)) {
            let doc = Value::Array(
                addresses
                    .iter()
                    .map(|a| json!({"kind": "k", "address": a}))
                    .collect(),
            );
            let out = normalize(&doc, Dialect::Native).expect("normalize");
            prop_assert_eq!(out.len(), addresses.len());
        }

        #[test]
        fn arbitrary_text_never_panics(text in ".{0,64}") {
            for dialect in Dialect::ALL {
                let _ = normalize_str(&text, dialect);
            }
        }
    }
}
