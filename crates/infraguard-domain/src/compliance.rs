//! Compliance tagger: aggregate-scope rules.
//!
//! Aggregate rules are evaluated once against the whole snapshot, after every
//! per-resource unit has finished, and report under the synthetic `global`
//! address.

use crate::engine::{EvalOptions, Outcomes};
use crate::eval::{Env, Evaluator};
use crate::predicate::{CmpOp, Collection, FieldRef, Operand, Predicate, Quantifier};
use crate::registry::Registry;
use infraguard_types::ids::GLOBAL_ADDRESS;
use infraguard_types::{Indeterminate, Violation};
use tracing::debug;

pub(crate) fn run_aggregate<'a>(
    evaluator: &Evaluator<'a>,
    registry: &'a Registry,
    options: &EvalOptions,
) -> Outcomes {
    let mut acc = Outcomes::default();
    for rule in registry.aggregate_rules() {
        if let Some(reason) = options.interruption() {
            acc.skip(reason);
            continue;
        }
        let mut env = Env::global();
        match evaluator.predicate(&rule.predicate, &mut env) {
            Ok(true) => acc.violations.push(Violation {
                rule_id: rule.id.clone(),
                severity: rule.severity,
                resource_address: GLOBAL_ADDRESS.to_string(),
                message: rule.render_message(None),
            }),
            Ok(false) => {}
            Err(err) => acc.indeterminates.push(Indeterminate {
                rule_id: rule.id.clone(),
                resource_address: GLOBAL_ADDRESS.to_string(),
                reason: err.to_string(),
            }),
        }
        acc.evaluated += 1;
    }
    debug!(
        evaluated = acc.evaluated,
        violations = acc.violations.len(),
        "aggregate rules finished"
    );
    acc
}

/// "Some resource carries `tag_key` (equal to `tag_value` when given), and no
/// resource of `counterpart_kinds` exists anywhere in the snapshot."
///
/// `counterpart_kinds` should be non-empty: an empty kind list matches every
/// resource, including the tagged one.
pub fn requires_counterpart(
    tag_key: &str,
    tag_value: Option<&str>,
    counterpart_kinds: &[&str],
) -> Predicate {
    let tag = FieldRef::new(Some("tagged"), format!("tags.{tag_key}"));
    let tagged = match tag_value {
        Some(value) => Predicate::compare(Operand::attr(tag), CmpOp::Eq, Operand::value(value)),
        None => Predicate::Present { field: tag },
    };
    let kinds = counterpart_kinds.iter().map(|k| k.to_string()).collect();

    Predicate::all(vec![
        Predicate::Exists(Quantifier::new(Collection::Kinds(Vec::new()), "tagged").filter(tagged)),
        Predicate::NotExists(Quantifier::new(Collection::Kinds(kinds), "counterpart")),
    ])
}
