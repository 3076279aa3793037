//! Predicate interpreter.
//!
//! Closed-world, finite-domain semantics over one [`Snapshot`]:
//! - `all` is false as soon as one branch is false, even if another branch errored;
//!   `any` is true as soon as one branch is true. Errors only surface when no
//!   branch decides the result, so evaluation order never changes the outcome.
//! - quantifiers scan the whole collection; `not_exists` is true exactly when
//!   no witness was found.

use crate::error::PredicateError;
use crate::model::Snapshot;
use crate::predicate::{
    CmpOp, Collection, FieldRef, Operand, Predicate, Quantifier, ResourcePath,
    classify_resource_path,
};
use crate::registry::Registry;
use crate::units::{self, Dimension, UnitError};
use infraguard_types::ResourceChange;
use infraguard_types::ids::BINDING_SUBJECT;
use serde_json::{Map, Value};
use std::cmp::Ordering;

const FALSY_STRINGS: &[&str] = &["false", "0", "no", "off", "disabled"];

#[derive(Clone, Copy, Debug)]
pub(crate) enum Datum<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Str(&'a str),
    List(&'a [Value]),
    Map(&'a Map<String, Value>),
}

impl<'a> Datum<'a> {
    pub(crate) fn from_value(value: &'a Value) -> Self {
        match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Datum::Null, Datum::Number),
            Value::String(s) => Datum::Str(s),
            Value::Array(items) => Datum::List(items),
            Value::Object(map) => Datum::Map(map),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Number(_) => "number",
            Datum::Str(_) => "string",
            Datum::List(_) => "list",
            Datum::Map(_) => "map",
        }
    }

    pub(crate) fn is_truthy(&self) -> bool {
        match self {
            Datum::Null => false,
            Datum::Bool(b) => *b,
            Datum::Number(n) => *n != 0.0,
            Datum::Str(s) => {
                let t = s.trim();
                !t.is_empty() && !FALSY_STRINGS.iter().any(|f| t.eq_ignore_ascii_case(f))
            }
            Datum::List(items) => !items.is_empty(),
            Datum::Map(map) => !map.is_empty(),
        }
    }

    pub(crate) fn render(&self) -> String {
        match self {
            Datum::Null => "<undefined>".to_string(),
            Datum::Bool(b) => b.to_string(),
            Datum::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Datum::Number(n) => n.to_string(),
            Datum::Str(s) => (*s).to_string(),
            Datum::List(items) => Value::Array(items.to_vec()).to_string(),
            Datum::Map(map) => Value::Object((*map).clone()).to_string(),
        }
    }

    fn equals(&self, other: &Datum<'_>) -> bool {
        match (self, other) {
            (Datum::Null, Datum::Null) => true,
            (Datum::Bool(a), Datum::Bool(b)) => a == b,
            (Datum::Number(a), Datum::Number(b)) => a == b,
            (Datum::Str(a), Datum::Str(b)) => a == b,
            (Datum::List(a), Datum::List(b)) => a == b,
            (Datum::Map(a), Datum::Map(b)) => a == b,
            _ => false,
        }
    }

    /// `None` when either side is null: absent data never satisfies a bound.
    fn order(&self, other: &Datum<'_>) -> Result<Option<Ordering>, PredicateError> {
        match (self, other) {
            (Datum::Null, _) | (_, Datum::Null) => Ok(None),
            (Datum::Number(a), Datum::Number(b)) => Ok(a.partial_cmp(b)),
            (Datum::Str(a), Datum::Str(b)) => Ok(Some(a.cmp(b))),
            (a, b) => Err(PredicateError::TypeMismatch(format!(
                "cannot order {} against {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }
}

/// Resolve a path against a resource. Paths are validated at load, so an
/// unrecognized path simply reads as absent.
pub(crate) fn resolve_resource<'a>(resource: &'a ResourceChange, path: &str) -> Datum<'a> {
    match classify_resource_path(path) {
        Ok(ResourcePath::Address) => Datum::Str(&resource.address),
        Ok(ResourcePath::Kind) => Datum::Str(&resource.kind),
        Ok(ResourcePath::Tag(key)) => resource
            .tags
            .get(key)
            .map_or(Datum::Null, |v| Datum::Str(v)),
        Ok(ResourcePath::Attributes(rest)) => walk_map(&resource.attributes, rest),
        Err(_) => Datum::Null,
    }
}

fn walk_map<'a>(map: &'a Map<String, Value>, rest: &str) -> Datum<'a> {
    if rest.is_empty() {
        return Datum::Map(map);
    }
    let (head, tail) = rest.split_once('.').unwrap_or((rest, ""));
    map.get(head).map_or(Datum::Null, |v| walk(v, tail))
}

fn walk<'a>(value: &'a Value, path: &str) -> Datum<'a> {
    let mut current = value;
    if !path.is_empty() {
        for segment in path.split('.') {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return Datum::Null,
            }
        }
    }
    Datum::from_value(current)
}

fn quantity<'a>(unit: Dimension, datum: Datum<'a>) -> Result<Datum<'a>, PredicateError> {
    match datum {
        Datum::Null => Ok(Datum::Null),
        Datum::Number(n) => Ok(Datum::Number(units::quantity_from_number(unit, n)?)),
        Datum::Str(s) => Ok(Datum::Number(units::parse_quantity(unit, s)?)),
        other => Err(UnitError::NotAQuantity {
            dimension: unit,
            found: other.type_name(),
        }
        .into()),
    }
}

fn compare(left: Datum<'_>, cmp: CmpOp, right: Datum<'_>) -> Result<bool, PredicateError> {
    let ordering = match cmp {
        CmpOp::Eq => return Ok(left.equals(&right)),
        CmpOp::Ne => return Ok(!left.equals(&right)),
        _ => left.order(&right)?,
    };
    let Some(o) = ordering else {
        return Ok(false);
    };
    Ok(match cmp {
        CmpOp::Lt => o == Ordering::Less,
        CmpOp::Le => o != Ordering::Greater,
        CmpOp::Gt => o == Ordering::Greater,
        CmpOp::Ge => o != Ordering::Less,
        CmpOp::Eq | CmpOp::Ne => false,
    })
}

fn contains(haystack: Datum<'_>, needle: Datum<'_>) -> Result<bool, PredicateError> {
    match (haystack, needle) {
        (Datum::Null, _) => Ok(false),
        (Datum::List(items), n) => Ok(items.iter().any(|v| Datum::from_value(v).equals(&n))),
        (Datum::Str(s), Datum::Str(n)) => Ok(s.contains(n)),
        (Datum::Map(map), Datum::Str(key)) => Ok(map.contains_key(key)),
        (h, n) => Err(PredicateError::TypeMismatch(format!(
            "cannot search a {} for a {}",
            h.type_name(),
            n.type_name()
        ))),
    }
}

/// What a field reference can point at.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Focus<'a> {
    Resource(&'a ResourceChange),
    Item(&'a Value),
}

pub(crate) struct Env<'a> {
    subject: Option<Focus<'a>>,
    frames: Vec<(&'a str, Focus<'a>)>,
}

impl<'a> Env<'a> {
    pub(crate) fn for_subject(subject: &'a ResourceChange) -> Self {
        Self {
            subject: Some(Focus::Resource(subject)),
            frames: Vec::new(),
        }
    }

    /// Environment for aggregate rules: no subject, only quantifier variables.
    pub(crate) fn global() -> Self {
        Self {
            subject: None,
            frames: Vec::new(),
        }
    }

    fn focus(&self, binding: Option<&str>) -> Result<Focus<'a>, PredicateError> {
        match binding {
            Some(BINDING_SUBJECT) => self
                .subject
                .ok_or_else(|| PredicateError::Unbound(BINDING_SUBJECT.to_string())),
            Some(name) => self
                .frames
                .iter()
                .rev()
                .find(|(n, _)| *n == name)
                .map(|(_, f)| *f)
                .ok_or_else(|| PredicateError::Unbound(name.to_string())),
            None => self
                .frames
                .last()
                .map(|(_, f)| *f)
                .or(self.subject)
                .ok_or_else(|| PredicateError::Unbound(BINDING_SUBJECT.to_string())),
        }
    }
}

pub(crate) struct Evaluator<'a> {
    snapshot: &'a Snapshot,
    registry: &'a Registry,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(snapshot: &'a Snapshot, registry: &'a Registry) -> Self {
        Self { snapshot, registry }
    }

    pub(crate) fn predicate(
        &self,
        predicate: &'a Predicate,
        env: &mut Env<'a>,
    ) -> Result<bool, PredicateError> {
        match predicate {
            Predicate::Const { value } => Ok(*value),
            Predicate::Not { expr } => self.predicate(expr, env).map(|b| !b),
            Predicate::All { exprs } => {
                let mut first_err = None;
                for expr in exprs {
                    match self.predicate(expr, env) {
                        Ok(false) => return Ok(false),
                        Ok(true) => {}
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                first_err.map_or(Ok(true), Err)
            }
            Predicate::Any { exprs } => {
                let mut first_err = None;
                for expr in exprs {
                    match self.predicate(expr, env) {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                first_err.map_or(Ok(false), Err)
            }
            Predicate::Compare { left, cmp, right } => {
                let l = self.operand(left, env)?;
                let r = self.operand(right, env)?;
                compare(l, *cmp, r)
            }
            Predicate::Present { field } => Ok(!matches!(self.field(field, env)?, Datum::Null)),
            Predicate::Truthy { fields } => {
                for field in fields {
                    if self.field(field, env)?.is_truthy() {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::OneOf { left, values } => {
                let l = self.operand(left, env)?;
                Ok(values.iter().any(|v| l.equals(&Datum::from_value(v))))
            }
            Predicate::Contains { left, right } => {
                let l = self.operand(left, env)?;
                let r = self.operand(right, env)?;
                contains(l, r)
            }
            Predicate::Exists(q) => self.exists(q, env),
            Predicate::Every(q) => self.every(q, env),
            Predicate::NotExists(q) => self.exists(q, env).map(|found| !found),
            Predicate::Call { helper, on } => {
                let focus = env.focus(on.as_deref())?;
                let helper = self
                    .registry
                    .helper(helper)
                    .ok_or_else(|| PredicateError::UndefinedHelper(helper.clone()))?;
                let mut inner = Env {
                    subject: Some(focus),
                    frames: Vec::new(),
                };
                self.predicate(&helper.predicate, &mut inner)
            }
        }
    }

    fn operand(&self, operand: &'a Operand, env: &mut Env<'a>) -> Result<Datum<'a>, PredicateError> {
        match operand {
            Operand::Attr(field) => self.field(field, env),
            Operand::Value(v) => Ok(Datum::from_value(v)),
            Operand::Quantity { unit, of } => {
                let inner = self.operand(of, env)?;
                quantity(*unit, inner)
            }
            Operand::Count(q) => self.count(q, env).map(|n| Datum::Number(n as f64)),
        }
    }

    fn field(&self, field: &FieldRef, env: &Env<'a>) -> Result<Datum<'a>, PredicateError> {
        Ok(match env.focus(field.binding())? {
            Focus::Resource(r) => resolve_resource(r, field.path()),
            Focus::Item(v) => walk(v, field.path()),
        })
    }

    fn domain(&self, over: &'a Collection, env: &Env<'a>) -> Result<Vec<Focus<'a>>, PredicateError> {
        match over {
            Collection::Kinds(kinds) => Ok(self
                .snapshot
                .of_kinds(kinds)
                .into_iter()
                .map(Focus::Resource)
                .collect()),
            Collection::Items(field) => match self.field(field, env)? {
                Datum::Null => Ok(Vec::new()),
                Datum::List(items) => Ok(items.iter().map(Focus::Item).collect()),
                other => Err(PredicateError::TypeMismatch(format!(
                    "'{field}' is a {}, expected a list",
                    other.type_name()
                ))),
            },
        }
    }

    /// `where` and `satisfies` for the element currently bound.
    fn element_matches(&self, q: &'a Quantifier, env: &mut Env<'a>) -> Result<bool, PredicateError> {
        let filter = match &q.filter {
            Some(f) => self.predicate(f, env),
            None => Ok(true),
        };
        if matches!(filter, Ok(false)) {
            return Ok(false);
        }
        let body = match &q.satisfies {
            Some(s) => self.predicate(s, env),
            None => Ok(true),
        };
        match body {
            Ok(false) => Ok(false),
            Ok(true) => filter,
            Err(e) => Err(filter.err().unwrap_or(e)),
        }
    }

    fn exists(&self, q: &'a Quantifier, env: &mut Env<'a>) -> Result<bool, PredicateError> {
        let mut first_err = None;
        for focus in self.domain(&q.over, env)? {
            env.frames.push((q.binding.as_str(), focus));
            let matched = self.element_matches(q, env);
            env.frames.pop();
            match matched {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        first_err.map_or(Ok(false), Err)
    }

    fn every(&self, q: &'a Quantifier, env: &mut Env<'a>) -> Result<bool, PredicateError> {
        let mut first_err = None;
        for focus in self.domain(&q.over, env)? {
            env.frames.push((q.binding.as_str(), focus));
            let holds = self.element_holds(q, env);
            env.frames.pop();
            match holds {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        first_err.map_or(Ok(true), Err)
    }

    /// Whether the bound element is consistent with a universal claim.
    fn element_holds(&self, q: &'a Quantifier, env: &mut Env<'a>) -> Result<bool, PredicateError> {
        let filter = match &q.filter {
            Some(f) => self.predicate(f, env),
            None => Ok(true),
        };
        if matches!(filter, Ok(false)) {
            return Ok(true);
        }
        let body = match &q.satisfies {
            Some(s) => self.predicate(s, env),
            None => Ok(true),
        };
        match body {
            Ok(true) => Ok(true),
            Ok(false) => filter.map(|_| false),
            Err(e) => Err(filter.err().unwrap_or(e)),
        }
    }

    fn count(&self, q: &'a Quantifier, env: &mut Env<'a>) -> Result<u64, PredicateError> {
        let mut n = 0;
        for focus in self.domain(&q.over, env)? {
            env.frames.push((q.binding.as_str(), focus));
            let matched = self.element_matches(q, env);
            env.frames.pop();
            if matched? {
                n += 1;
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_covers_equivalent_encodings() {
        let yes = [json!(true), json!(1), json!("enabled"), json!(["x"]), json!({"a": 1})];
        let no = [
            json!(false),
            json!(0),
            json!(""),
            json!("Disabled"),
            json!("off"),
            json!([]),
            json!({}),
            json!(null),
        ];
        for v in &yes {
            assert!(Datum::from_value(v).is_truthy(), "{v} should be truthy");
        }
        for v in &no {
            assert!(!Datum::from_value(v).is_truthy(), "{v} should be falsy");
        }
    }

    #[test]
    fn ordering_against_null_is_false_not_an_error() {
        assert_eq!(compare(Datum::Null, CmpOp::Gt, Datum::Number(1.0)), Ok(false));
        assert_eq!(compare(Datum::Number(1.0), CmpOp::Le, Datum::Null), Ok(false));
    }

    #[test]
    fn ordering_across_types_is_an_error() {
        let err = compare(Datum::Str("5"), CmpOp::Gt, Datum::Number(4.0)).unwrap_err();
        assert_eq!(
            err,
            PredicateError::TypeMismatch("cannot order string against number".to_string())
        );
    }

    #[test]
    fn equality_is_structural_and_never_fails() {
        assert_eq!(compare(Datum::Str("1"), CmpOp::Eq, Datum::Number(1.0)), Ok(false));
        assert_eq!(compare(Datum::Number(1.0), CmpOp::Eq, Datum::Number(1.0)), Ok(true));
        assert_eq!(compare(Datum::Null, CmpOp::Ne, Datum::Bool(false)), Ok(true));
    }

    #[test]
    fn walk_indexes_lists_and_maps() {
        let v = json!({"spec": {"containers": [{"name": "a"}, {"name": "b"}]}});
        assert!(matches!(walk(&v, "spec.containers.1.name"), Datum::Str("b")));
        assert!(matches!(walk(&v, "spec.containers.9.name"), Datum::Null));
        assert!(matches!(walk(&v, ""), Datum::Map(_)));
    }

    #[test]
    fn resolve_reads_tags_and_nested_attributes() {
        let r = ResourceChange::new("pod", "pod/default/web")
            .with_tag("app.kubernetes.io/name", "web")
            .with_attribute("spec", json!({"hostNetwork": true}));
        assert!(matches!(
            resolve_resource(&r, "tags.app.kubernetes.io/name"),
            Datum::Str("web")
        ));
        assert!(matches!(
            resolve_resource(&r, "attributes.spec.hostNetwork"),
            Datum::Bool(true)
        ));
        assert!(matches!(resolve_resource(&r, "address"), Datum::Str("pod/default/web")));
    }

    #[test]
    fn contains_handles_lists_strings_and_maps() {
        let list = json!(["0.0.0.0/0", "10.0.0.0/8"]);
        assert_eq!(
            contains(Datum::from_value(&list), Datum::Str("0.0.0.0/0")),
            Ok(true)
        );
        assert_eq!(contains(Datum::Str("alpine:latest"), Datum::Str(":latest")), Ok(true));
        assert_eq!(contains(Datum::Null, Datum::Str("x")), Ok(false));
        assert!(contains(Datum::Number(1.0), Datum::Str("x")).is_err());
    }

    #[test]
    fn quantity_rejects_non_scalar_values() {
        let list = json!([1]);
        assert!(matches!(
            quantity(Dimension::Cpu, Datum::from_value(&list)),
            Err(PredicateError::Unit(UnitError::NotAQuantity { .. }))
        ));
        assert!(matches!(quantity(Dimension::Cpu, Datum::Null), Ok(Datum::Null)));
    }
}
