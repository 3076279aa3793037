use crate::registry::{HelperDefinition, Registry, RuleDefinition, RuleScope, RuleSource, SubjectKind};
use infraguard_types::{ResourceChange, Severity};
use serde_json::{Value, json};

pub fn resource(kind: &str, address: &str, attributes: Value) -> ResourceChange {
    let mut r = ResourceChange::new(kind, address);
    if let Value::Object(map) = attributes {
        r.attributes = map;
    }
    r
}

pub fn rule(id: &str, severity: Severity, predicate: Value) -> RuleDefinition {
    RuleDefinition {
        id: id.to_string(),
        domain: "test".to_string(),
        severity,
        scope: RuleScope::PerResource,
        kinds: Vec::new(),
        concern: None,
        message: "{rule_id}: {address}".to_string(),
        predicate: serde_json::from_value(predicate).expect("predicate json"),
    }
}

pub fn helper(id: &str, predicate: Value) -> HelperDefinition {
    HelperDefinition {
        id: id.to_string(),
        subject: SubjectKind::Resource,
        description: None,
        predicate: serde_json::from_value(predicate).expect("predicate json"),
    }
}

pub fn source(helpers: Vec<HelperDefinition>, rules: Vec<RuleDefinition>) -> RuleSource {
    RuleSource { helpers, rules }
}

pub fn registry(helpers: Vec<HelperDefinition>, rules: Vec<RuleDefinition>) -> Registry {
    Registry::load(source(helpers, rules)).expect("registry")
}

/// Networks must have a flow log whose `vpc_id` names them.
pub fn flow_log_rule() -> RuleDefinition {
    let mut r = rule(
        "network.flow_logs",
        Severity::Deny,
        json!({
            "op": "not_exists",
            "over": {"kinds": ["flow-log"]},
            "as": "log",
            "where": {
                "op": "compare",
                "left": {"attr": "log:attributes.vpc_id"},
                "cmp": "eq",
                "right": {"attr": "subject:address"}
            }
        }),
    );
    r.domain = "network".to_string();
    r.kinds = vec!["network".to_string()];
    r
}

/// Container cpu must not exceed 4000 millicores.
pub fn cpu_limit_rule() -> RuleDefinition {
    let mut r = rule(
        "container.cpu_limit",
        Severity::Deny,
        json!({
            "op": "compare",
            "left": {"quantity": {"unit": "cpu", "of": {"attr": "attributes.cpu"}}},
            "cmp": "gt",
            "right": {"quantity": {"unit": "cpu", "of": {"value": "4000m"}}}
        }),
    );
    r.domain = "container".to_string();
    r.kinds = vec!["container".to_string()];
    r
}
