//! Rule registry: load-time validation and indexing.
//!
//! `Registry::load` either returns a fully validated registry or the first
//! [`DefinitionError`] found; nothing is evaluated against a partial registry.
//! Helpers may only call helpers defined before them, so the helper graph is
//! a DAG by construction once loading succeeds.

use crate::error::DefinitionError;
use crate::lint::{SeverityInconsistency, severity_inconsistencies};
use crate::predicate::{
    Collection, FieldRef, Operand, Predicate, Quantifier, classify_resource_path, is_identifier,
};
use crate::template::MessageTemplate;
use crate::units::{self, UnitError};
use infraguard_types::ids::BINDING_SUBJECT;
use infraguard_types::{ResourceChange, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Evaluated once per admissible resource, with that resource as subject.
    #[default]
    PerResource,
    /// Evaluated once against the whole snapshot; violations use the `global` address.
    Aggregate,
}

/// What a helper's `subject` binding refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    #[default]
    Resource,
    Item,
}

impl SubjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectKind::Resource => "resource",
            SubjectKind::Item => "item",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HelperDefinition {
    pub id: String,
    #[serde(default)]
    pub subject: SubjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub predicate: Predicate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub domain: String,
    pub severity: Severity,
    #[serde(default)]
    pub scope: RuleScope,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concern: Option<String>,
    pub message: String,
    pub predicate: Predicate,
}

/// Pre-parsed rule set: helpers in definition order, then rules.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSource {
    #[serde(default, rename = "helper", alias = "helpers")]
    pub helpers: Vec<HelperDefinition>,
    #[serde(default, rename = "rule", alias = "rules")]
    pub rules: Vec<RuleDefinition>,
}

impl RuleSource {
    /// Append `other`; its helpers come after the ones already present.
    pub fn extend(&mut self, other: RuleSource) {
        self.helpers.extend(other.helpers);
        self.rules.extend(other.rules);
    }
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub id: String,
    pub domain: String,
    pub severity: Severity,
    pub scope: RuleScope,
    pub kinds: Vec<String>,
    pub concern: Option<String>,
    pub template: MessageTemplate,
    pub predicate: Predicate,
}

impl Rule {
    pub fn render_message(&self, subject: Option<&ResourceChange>) -> String {
        self.template.render(&self.id, &self.domain, subject)
    }
}

#[derive(Clone, Debug)]
pub struct Helper {
    pub id: String,
    pub subject: SubjectKind,
    pub description: Option<String>,
    pub predicate: Predicate,
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    /// Sorted by id.
    rules: Vec<Rule>,
    helpers: BTreeMap<String, Helper>,
}

impl Registry {
    pub fn load(source: RuleSource) -> Result<Self, DefinitionError> {
        let RuleSource { helpers, rules } = source;

        for h in &helpers {
            if h.id.trim().is_empty() {
                return Err(DefinitionError::EmptyId { what: "helper" });
            }
        }
        for r in &rules {
            if r.id.trim().is_empty() {
                return Err(DefinitionError::EmptyId { what: "rule" });
            }
        }

        let mut position: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, h) in helpers.iter().enumerate() {
            if position.insert(h.id.as_str(), i).is_some() {
                return Err(DefinitionError::DuplicateHelper { id: h.id.clone() });
            }
        }

        let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for h in &helpers {
            let mut calls = Vec::new();
            collect_calls(&h.predicate, &mut calls);
            for callee in &calls {
                if !position.contains_key(callee) {
                    return Err(DefinitionError::UndefinedHelper {
                        owner: helper_owner(&h.id),
                        helper: (*callee).to_string(),
                    });
                }
            }
            edges.insert(h.id.as_str(), calls);
        }

        if let Some(cycle) = find_cycle(&helpers, &edges) {
            return Err(DefinitionError::CyclicHelper { cycle });
        }

        for (i, h) in helpers.iter().enumerate() {
            for callee in edges.get(h.id.as_str()).into_iter().flatten() {
                if position.get(callee).is_some_and(|&j| j >= i) {
                    return Err(DefinitionError::ForwardHelperReference {
                        owner: helper_owner(&h.id),
                        helper: (*callee).to_string(),
                    });
                }
            }
        }

        let subjects: BTreeMap<&str, SubjectKind> =
            helpers.iter().map(|h| (h.id.as_str(), h.subject)).collect();

        for h in &helpers {
            let checker = Checker {
                owner: helper_owner(&h.id),
                helpers: &subjects,
            };
            checker.predicate(&h.predicate, &mut Scope::with_subject(Some(h.subject)))?;
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut loaded: Vec<Rule> = Vec::with_capacity(rules.len());
        for r in &rules {
            if !seen.insert(r.id.as_str()) {
                return Err(DefinitionError::DuplicateRule { id: r.id.clone() });
            }
        }
        for r in rules {
            let owner = rule_owner(&r.id);

            let mut calls = Vec::new();
            collect_calls(&r.predicate, &mut calls);
            if let Some(missing) = calls.iter().find(|c| !subjects.contains_key(*c)) {
                return Err(DefinitionError::UndefinedHelper {
                    owner,
                    helper: (*missing).to_string(),
                });
            }

            let subject = match r.scope {
                RuleScope::PerResource => Some(SubjectKind::Resource),
                RuleScope::Aggregate => None,
            };
            if r.scope == RuleScope::Aggregate && !r.kinds.is_empty() {
                return Err(DefinitionError::MalformedPredicate {
                    owner,
                    reason: "aggregate rules have no subject and cannot filter by kinds"
                        .to_string(),
                });
            }
            let checker = Checker {
                owner,
                helpers: &subjects,
            };
            checker.predicate(&r.predicate, &mut Scope::with_subject(subject))?;

            let template = MessageTemplate::parse(&r.message).map_err(|reason| {
                DefinitionError::InvalidTemplate {
                    rule: r.id.clone(),
                    reason,
                }
            })?;
            if r.scope == RuleScope::Aggregate && template.has_field_placeholders() {
                return Err(DefinitionError::InvalidTemplate {
                    rule: r.id.clone(),
                    reason: "aggregate rules may only use {rule_id} and {domain}".to_string(),
                });
            }

            loaded.push(Rule {
                id: r.id,
                domain: r.domain,
                severity: r.severity,
                scope: r.scope,
                kinds: r.kinds,
                concern: r.concern,
                template,
                predicate: r.predicate,
            });
        }
        loaded.sort_by(|a, b| a.id.cmp(&b.id));

        let helpers = helpers
            .into_iter()
            .map(|h| {
                (
                    h.id.clone(),
                    Helper {
                        id: h.id,
                        subject: h.subject,
                        description: h.description,
                        predicate: h.predicate,
                    },
                )
            })
            .collect();

        Ok(Self {
            rules: loaded,
            helpers,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules
            .binary_search_by(|r| r.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.rules[i])
    }

    pub fn per_resource_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(|r| r.scope == RuleScope::PerResource)
    }

    pub fn aggregate_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.scope == RuleScope::Aggregate)
    }

    pub fn helper(&self, id: &str) -> Option<&Helper> {
        self.helpers.get(id)
    }

    pub fn helpers(&self) -> impl Iterator<Item = &Helper> {
        self.helpers.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn severity_inconsistencies(&self) -> Vec<SeverityInconsistency> {
        severity_inconsistencies(&self.rules)
    }
}

fn helper_owner(id: &str) -> String {
    format!("helper '{id}'")
}

fn rule_owner(id: &str) -> String {
    format!("rule '{id}'")
}

fn collect_calls<'p>(predicate: &'p Predicate, out: &mut Vec<&'p str>) {
    match predicate {
        Predicate::Const { .. } | Predicate::Present { .. } | Predicate::Truthy { .. } => {}
        Predicate::Not { expr } => collect_calls(expr, out),
        Predicate::All { exprs } | Predicate::Any { exprs } => {
            for e in exprs {
                collect_calls(e, out);
            }
        }
        Predicate::Compare { left, right, .. } | Predicate::Contains { left, right } => {
            collect_operand_calls(left, out);
            collect_operand_calls(right, out);
        }
        Predicate::OneOf { left, .. } => collect_operand_calls(left, out),
        Predicate::Exists(q) | Predicate::Every(q) | Predicate::NotExists(q) => {
            collect_quantifier_calls(q, out)
        }
        Predicate::Call { helper, .. } => {
            if !out.contains(&helper.as_str()) {
                out.push(helper);
            }
        }
    }
}

fn collect_operand_calls<'p>(operand: &'p Operand, out: &mut Vec<&'p str>) {
    match operand {
        Operand::Attr(_) | Operand::Value(_) => {}
        Operand::Quantity { of, .. } => collect_operand_calls(of, out),
        Operand::Count(q) => collect_quantifier_calls(q, out),
    }
}

fn collect_quantifier_calls<'p>(q: &'p Quantifier, out: &mut Vec<&'p str>) {
    if let Some(f) = &q.filter {
        collect_calls(f, out);
    }
    if let Some(s) = &q.satisfies {
        collect_calls(s, out);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// First cycle in the helper call graph, as a path that starts and ends on the same id.
fn find_cycle(helpers: &[HelperDefinition], edges: &BTreeMap<&str, Vec<&str>>) -> Option<Vec<String>> {
    fn visit<'a>(
        node: &'a str,
        edges: &BTreeMap<&'a str, Vec<&'a str>>,
        marks: &mut BTreeMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Active) => {
                let start = path.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(node.to_string());
                return Some(cycle);
            }
            None => {}
        }
        marks.insert(node, Mark::Active);
        path.push(node);
        for next in edges.get(node).into_iter().flatten() {
            if let Some(cycle) = visit(next, edges, marks, path) {
                return Some(cycle);
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        None
    }

    let mut marks = BTreeMap::new();
    for h in helpers {
        let mut path = Vec::new();
        if let Some(cycle) = visit(h.id.as_str(), edges, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

/// Bindings visible at one point of a predicate.
struct Scope<'p> {
    subject: Option<SubjectKind>,
    vars: Vec<(&'p str, SubjectKind)>,
}

impl<'p> Scope<'p> {
    fn with_subject(subject: Option<SubjectKind>) -> Self {
        Self {
            subject,
            vars: Vec::new(),
        }
    }

    fn resolve(&self, binding: Option<&str>) -> Option<SubjectKind> {
        match binding {
            Some(BINDING_SUBJECT) => self.subject,
            Some(name) => self
                .vars
                .iter()
                .rev()
                .find(|(n, _)| *n == name)
                .map(|(_, k)| *k),
            None => self.vars.last().map(|(_, k)| *k).or(self.subject),
        }
    }
}

/// Static checks for one rule or helper body.
struct Checker<'d> {
    owner: String,
    helpers: &'d BTreeMap<&'d str, SubjectKind>,
}

impl Checker<'_> {
    fn focus(&self, binding: Option<&str>, scope: &Scope<'_>) -> Result<SubjectKind, DefinitionError> {
        scope
            .resolve(binding)
            .ok_or_else(|| DefinitionError::UnboundVariable {
                owner: self.owner.clone(),
                name: binding.unwrap_or(BINDING_SUBJECT).to_string(),
            })
    }

    fn field(&self, field: &FieldRef, scope: &Scope<'_>) -> Result<(), DefinitionError> {
        let invalid = |reason: String| DefinitionError::InvalidPath {
            owner: self.owner.clone(),
            path: field.to_string(),
            reason,
        };
        match self.focus(field.binding(), scope)? {
            SubjectKind::Resource => classify_resource_path(field.path())
                .map(|_| ())
                .map_err(invalid),
            SubjectKind::Item => {
                let path = field.path();
                if !path.is_empty() && path.split('.').any(str::is_empty) {
                    return Err(invalid("empty path segment".to_string()));
                }
                Ok(())
            }
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> DefinitionError {
        DefinitionError::MalformedPredicate {
            owner: self.owner.clone(),
            reason: reason.into(),
        }
    }

    fn predicate<'p>(&self, predicate: &'p Predicate, scope: &mut Scope<'p>) -> Result<(), DefinitionError> {
        match predicate {
            Predicate::Const { .. } => Ok(()),
            Predicate::Not { expr } => self.predicate(expr, scope),
            Predicate::All { exprs } | Predicate::Any { exprs } => {
                for e in exprs {
                    self.predicate(e, scope)?;
                }
                Ok(())
            }
            Predicate::Compare { left, right, .. } | Predicate::Contains { left, right } => {
                self.operand(left, scope)?;
                self.operand(right, scope)
            }
            Predicate::Present { field } => self.field(field, scope),
            Predicate::Truthy { fields } => {
                if fields.is_empty() {
                    return Err(self.malformed("truthy needs at least one field"));
                }
                for f in fields {
                    self.field(f, scope)?;
                }
                Ok(())
            }
            Predicate::OneOf { left, values } => {
                if values.is_empty() {
                    return Err(self.malformed("one_of needs at least one value"));
                }
                self.operand(left, scope)
            }
            Predicate::Exists(q) | Predicate::NotExists(q) => self.quantifier(q, scope, false),
            Predicate::Every(q) => self.quantifier(q, scope, true),
            Predicate::Call { helper, on } => {
                let found = self.focus(on.as_deref(), scope)?;
                let expected =
                    self.helpers
                        .get(helper.as_str())
                        .ok_or_else(|| DefinitionError::UndefinedHelper {
                            owner: self.owner.clone(),
                            helper: helper.clone(),
                        })?;
                if *expected != found {
                    return Err(DefinitionError::SubjectMismatch {
                        owner: self.owner.clone(),
                        helper: helper.clone(),
                        expected: expected.as_str(),
                        found: found.as_str(),
                    });
                }
                Ok(())
            }
        }
    }

    fn quantifier<'p>(
        &self,
        q: &'p Quantifier,
        scope: &mut Scope<'p>,
        needs_satisfies: bool,
    ) -> Result<(), DefinitionError> {
        if !is_identifier(&q.binding) || q.binding == BINDING_SUBJECT {
            return Err(self.malformed(format!("'{}' cannot be used as a variable name", q.binding)));
        }
        if needs_satisfies && q.satisfies.is_none() {
            return Err(self.malformed("every needs a satisfies clause"));
        }
        let kind = match &q.over {
            Collection::Kinds(_) => SubjectKind::Resource,
            Collection::Items(field) => {
                self.field(field, scope)?;
                SubjectKind::Item
            }
        };
        scope.vars.push((q.binding.as_str(), kind));
        let checked = q
            .filter
            .iter()
            .chain(q.satisfies.iter())
            .try_for_each(|p| self.predicate(p, scope));
        scope.vars.pop();
        checked
    }

    fn operand<'p>(&self, operand: &'p Operand, scope: &mut Scope<'p>) -> Result<(), DefinitionError> {
        match operand {
            Operand::Attr(field) => self.field(field, scope),
            Operand::Value(_) => Ok(()),
            Operand::Quantity { unit, of } => {
                if let Operand::Value(literal) = of.as_ref() {
                    let parsed = match literal {
                        Value::Null => Ok(0.0),
                        Value::String(s) => units::parse_quantity(*unit, s),
                        Value::Number(n) => {
                            units::quantity_from_number(*unit, n.as_f64().unwrap_or(-1.0))
                        }
                        other => Err(UnitError::NotAQuantity {
                            dimension: *unit,
                            found: json_type_name(other),
                        }),
                    };
                    parsed.map_err(|source| DefinitionError::InvalidQuantity {
                        owner: self.owner.clone(),
                        source,
                    })?;
                }
                self.operand(of, scope)
            }
            Operand::Count(q) => self.quantifier(q, scope, false),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
