//! Violation message templates.
//!
//! Placeholders: `{address}`, `{kind}`, `{tags.<key>}`, `{attributes.<path>}`,
//! `{rule_id}`, `{domain}`. `{{` and `}}` produce literal braces. Absent
//! fields render as `<undefined>`.

use crate::eval::{Datum, resolve_resource};
use crate::predicate::classify_resource_path;
use infraguard_types::ResourceChange;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Text(String),
    RuleId,
    Domain,
    Field(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageTemplate {
    parts: Vec<Part>,
}

impl MessageTemplate {
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err("unmatched '}'".to_string()),
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(format!("unclosed placeholder '{{{name}'"));
                    }
                    let name = name.trim();
                    let part = match name {
                        "" => return Err("empty placeholder".to_string()),
                        "rule_id" => Part::RuleId,
                        "domain" => Part::Domain,
                        field => {
                            classify_resource_path(field)
                                .map_err(|reason| format!("placeholder '{field}': {reason}"))?;
                            Part::Field(field.to_string())
                        }
                    };
                    if !literal.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut literal)));
                    }
                    parts.push(part);
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Text(literal));
        }
        Ok(Self { parts })
    }

    pub fn has_field_placeholders(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Field(_)))
    }

    pub fn render(&self, rule_id: &str, domain: &str, subject: Option<&ResourceChange>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(t) => out.push_str(t),
                Part::RuleId => out.push_str(rule_id),
                Part::Domain => out.push_str(domain),
                Part::Field(path) => {
                    let datum = subject
                        .map(|r| resolve_resource(r, path))
                        .unwrap_or(Datum::Null);
                    out.push_str(&datum.render());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_fields_tags_and_rule_metadata() {
        let t = MessageTemplate::parse(
            "[{rule_id}/{domain}] {kind} {address} (owner={tags.owner}, size={attributes.size})",
        )
        .expect("parse");
        let r = ResourceChange::new("storage-bucket", "b1")
            .with_tag("owner", "ops")
            .with_attribute("size", json!(10));
        assert_eq!(
            t.render("storage.encrypted", "storage", Some(&r)),
            "[storage.encrypted/storage] storage-bucket b1 (owner=ops, size=10)"
        );
    }

    #[test]
    fn missing_fields_render_undefined() {
        let t = MessageTemplate::parse("{attributes.nope} {tags.nope}").expect("parse");
        let r = ResourceChange::new("k", "a");
        assert_eq!(t.render("r", "d", Some(&r)), "<undefined> <undefined>");
        assert_eq!(t.render("r", "d", None), "<undefined> <undefined>");
    }

    #[test]
    fn braces_escape() {
        let t = MessageTemplate::parse("{{literal}} {address}").expect("parse");
        let r = ResourceChange::new("k", "a");
        assert_eq!(t.render("r", "d", Some(&r)), "{literal} a");
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert!(MessageTemplate::parse("{address").is_err());
        assert!(MessageTemplate::parse("oops }").is_err());
        assert!(MessageTemplate::parse("{}").is_err());
        assert!(MessageTemplate::parse("{spec.replicas}").is_err());
    }

    #[test]
    fn field_placeholders_are_detected() {
        assert!(
            MessageTemplate::parse("{address}")
                .expect("parse")
                .has_field_placeholders()
        );
        assert!(
            !MessageTemplate::parse("{rule_id} in {domain}")
                .expect("parse")
                .has_field_placeholders()
        );
    }
}
