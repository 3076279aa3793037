//! Predicate expression trees.
//!
//! Rules and helpers carry a [`Predicate`]; the engine interprets it against
//! one subject resource (per-resource rules) or against the whole snapshot
//! (aggregate rules). The serialized form is the pre-parsed rule format the
//! registry accepts, e.g.
//!
//! ```json
//! { "op": "not_exists",
//!   "over": { "kinds": ["flow-log"] },
//!   "as": "log",
//!   "where": { "op": "compare",
//!              "left": { "attr": "log:attributes.vpc_id" },
//!              "cmp": "eq",
//!              "right": { "attr": "subject:address" } } }
//! ```

use crate::units::Dimension;
use infraguard_types::ids::BINDING_SUBJECT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Const {
        value: bool,
    },
    Not {
        expr: Box<Predicate>,
    },
    All {
        exprs: Vec<Predicate>,
    },
    Any {
        exprs: Vec<Predicate>,
    },
    Compare {
        left: Operand,
        cmp: CmpOp,
        right: Operand,
    },
    /// Field is present and not null.
    Present {
        field: FieldRef,
    },
    /// At least one of several equivalent fields is truthy.
    Truthy {
        fields: Vec<FieldRef>,
    },
    OneOf {
        left: Operand,
        values: Vec<Value>,
    },
    /// List membership, substring, or map key containment.
    Contains {
        left: Operand,
        right: Operand,
    },
    /// Existential quantifier: some element passes `where` and `satisfies`.
    #[serde(rename = "some")]
    Exists(Quantifier),
    /// Universal quantifier over the elements that pass `where`.
    Every(Quantifier),
    /// Negation as failure: true iff the whole collection has no witness.
    NotExists(Quantifier),
    Call {
        helper: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on: Option<String>,
    },
}

impl Predicate {
    pub fn not(expr: Predicate) -> Self {
        Predicate::Not {
            expr: Box::new(expr),
        }
    }

    pub fn all(exprs: Vec<Predicate>) -> Self {
        Predicate::All { exprs }
    }

    pub fn any(exprs: Vec<Predicate>) -> Self {
        Predicate::Any { exprs }
    }

    pub fn compare(left: Operand, cmp: CmpOp, right: Operand) -> Self {
        Predicate::Compare { left, cmp, right }
    }

    pub fn call(helper: impl Into<String>) -> Self {
        Predicate::Call {
            helper: helper.into(),
            on: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantifier {
    pub over: Collection,
    #[serde(rename = "as", default = "default_binding")]
    pub binding: String,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<Predicate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfies: Option<Box<Predicate>>,
}

fn default_binding() -> String {
    "it".to_string()
}

impl Quantifier {
    pub fn new(over: Collection, binding: impl Into<String>) -> Self {
        Self {
            over,
            binding: binding.into(),
            filter: None,
            satisfies: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(Box::new(predicate));
        self
    }

    pub fn satisfies(mut self, predicate: Predicate) -> Self {
        self.satisfies = Some(Box::new(predicate));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Resources of the listed kinds, read through the kind index. Empty means every resource.
    Kinds(Vec<String>),
    /// Elements of a list-valued field.
    Items(FieldRef),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Attr(FieldRef),
    Value(Value),
    Quantity { unit: Dimension, of: Box<Operand> },
    Count(Box<Quantifier>),
}

impl Operand {
    pub fn attr(field: FieldRef) -> Self {
        Operand::Attr(field)
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Operand::Value(value.into())
    }

    pub fn quantity(unit: Dimension, of: Operand) -> Self {
        Operand::Quantity {
            unit,
            of: Box::new(of),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Reference to a field of a bound value, written `"[binding:]path"`.
///
/// Without a binding the innermost quantifier variable is used, or the
/// subject when no quantifier is open.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldRef {
    binding: Option<String>,
    path: String,
}

impl FieldRef {
    /// Build a reference without validating the path; the registry validates on load.
    pub fn new(binding: Option<&str>, path: impl Into<String>) -> Self {
        Self {
            binding: binding.map(str::to_string),
            path: path.into(),
        }
    }

    pub fn subject(path: impl Into<String>) -> Self {
        Self::new(Some(BINDING_SUBJECT), path)
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        if let Some((head, rest)) = text.split_once(':')
            && is_identifier(head)
        {
            return Ok(Self::new(Some(head), rest));
        }
        if text.contains(char::is_whitespace) {
            return Err(format!("field reference '{text}' contains whitespace"));
        }
        Ok(Self::new(None, text))
    }

    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binding {
            Some(b) => write!(f, "{b}:{}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

impl TryFrom<String> for FieldRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldRef::parse(&value)
    }
}

impl From<FieldRef> for String {
    fn from(value: FieldRef) -> Self {
        value.to_string()
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Interpretation of a path against a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResourcePath<'p> {
    Address,
    Kind,
    Tag(&'p str),
    /// Dotted remainder below `attributes` (empty for the whole map).
    Attributes(&'p str),
}

pub(crate) fn classify_resource_path(path: &str) -> Result<ResourcePath<'_>, String> {
    match path {
        "address" => return Ok(ResourcePath::Address),
        "kind" => return Ok(ResourcePath::Kind),
        "attributes" => return Ok(ResourcePath::Attributes("")),
        "tags" => return Err("tags must be followed by a tag key".to_string()),
        _ => {}
    }
    if let Some(key) = path.strip_prefix("tags.") {
        if key.is_empty() {
            return Err("empty tag key".to_string());
        }
        return Ok(ResourcePath::Tag(key));
    }
    if let Some(rest) = path.strip_prefix("attributes.") {
        if rest.split('.').any(str::is_empty) {
            return Err("empty path segment".to_string());
        }
        return Ok(ResourcePath::Attributes(rest));
    }
    Err("resource paths start with address, kind, tags.<key>, or attributes".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_ref_splits_binding_prefix() {
        let f = FieldRef::parse("log:attributes.vpc_id").expect("parse");
        assert_eq!(f.binding(), Some("log"));
        assert_eq!(f.path(), "attributes.vpc_id");

        let f = FieldRef::parse("attributes.encryption").expect("parse");
        assert_eq!(f.binding(), None);

        // A colon inside a tag key is not a binding prefix.
        let f = FieldRef::parse("tags.example.com/owner:team").expect("parse");
        assert_eq!(f.binding(), None);
        assert_eq!(f.path(), "tags.example.com/owner:team");
    }

    #[test]
    fn classify_tag_keeps_dotted_keys() {
        assert_eq!(
            classify_resource_path("tags.app.kubernetes.io/name"),
            Ok(ResourcePath::Tag("app.kubernetes.io/name"))
        );
        assert!(classify_resource_path("tags").is_err());
        assert!(classify_resource_path("spec.containers").is_err());
        assert!(classify_resource_path("attributes..x").is_err());
    }

    #[test]
    fn predicate_deserializes_from_tagged_json() {
        let p: Predicate = serde_json::from_value(json!({
            "op": "not_exists",
            "over": {"kinds": ["flow-log"]},
            "as": "log",
            "where": {
                "op": "compare",
                "left": {"attr": "log:attributes.vpc_id"},
                "cmp": "eq",
                "right": {"attr": "subject:address"}
            }
        }))
        .expect("parse predicate");

        let Predicate::NotExists(q) = p else {
            panic!("expected not_exists");
        };
        assert_eq!(q.binding, "log");
        assert_eq!(q.over, Collection::Kinds(vec!["flow-log".to_string()]));
        assert!(q.filter.is_some());
        assert!(q.satisfies.is_none());
    }

    #[test]
    fn quantifier_binding_defaults_to_it() {
        let p: Predicate = serde_json::from_value(json!({
            "op": "some",
            "over": {"items": "attributes.containers"},
            "satisfies": {"op": "const", "value": true}
        }))
        .expect("parse predicate");
        let Predicate::Exists(q) = p else {
            panic!("expected some");
        };
        assert_eq!(q.binding, "it");
    }

    #[test]
    fn quantity_operand_round_trips() {
        let op = Operand::quantity(Dimension::Cpu, Operand::value("4000m"));
        let text = serde_json::to_string(&op).expect("serialize");
        let back: Operand = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, op);
    }
}
