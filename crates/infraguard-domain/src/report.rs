//! Violation aggregation: dedup, deterministic ordering, counts and verdict.

use crate::error::CancellationError;
use infraguard_types::{Counts, EvaluationReport, Indeterminate, Severity, Verdict, Violation};

/// Run bookkeeping that is logged and rendered but never part of the wire report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub resources: usize,
    pub rules: usize,
    pub units_evaluated: usize,
    pub units_skipped: usize,
    pub interrupted: Option<CancellationError>,
}

#[derive(Clone, Debug)]
pub struct DomainReport {
    pub report: EvaluationReport,
    pub stats: RunStats,
}

pub fn aggregate(
    mut violations: Vec<Violation>,
    mut indeterminates: Vec<Indeterminate>,
    interrupted: bool,
) -> EvaluationReport {
    violations.sort_by(compare_violations);
    violations.dedup_by(|b, a| a.rule_id == b.rule_id && a.resource_address == b.resource_address);

    indeterminates.sort_by(compare_indeterminates);
    indeterminates
        .dedup_by(|b, a| a.rule_id == b.rule_id && a.resource_address == b.resource_address);

    let verdict = compute_verdict(&violations, interrupted);
    let counts = Counts::tally(&violations, &indeterminates);

    EvaluationReport {
        verdict,
        violations,
        indeterminates,
        counts,
    }
}

fn compute_verdict(violations: &[Violation], interrupted: bool) -> Verdict {
    if interrupted {
        return Verdict::Incomplete;
    }
    if violations.iter().any(|v| v.severity == Severity::Deny) {
        return Verdict::Fail;
    }
    Verdict::Pass
}

fn compare_violations(a: &Violation, b: &Violation) -> std::cmp::Ordering {
    // Ordering priority:
    // 1) severity (deny -> warn)
    // 2) rule_id
    // 3) resource_address
    // 4) message
    a.severity
        .cmp(&b.severity)
        .then(a.rule_id.cmp(&b.rule_id))
        .then(a.resource_address.cmp(&b.resource_address))
        .then(a.message.cmp(&b.message))
}

fn compare_indeterminates(a: &Indeterminate, b: &Indeterminate) -> std::cmp::Ordering {
    a.rule_id
        .cmp(&b.rule_id)
        .then(a.resource_address.cmp(&b.resource_address))
        .then(a.reason.cmp(&b.reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(rule_id: &str, severity: Severity, address: &str, message: &str) -> Violation {
        Violation {
            rule_id: rule_id.to_string(),
            severity,
            resource_address: address.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn sorts_deny_first_then_rule_then_address() {
        let report = aggregate(
            vec![
                violation("b", Severity::Warn, "x", "m"),
                violation("b", Severity::Deny, "z", "m"),
                violation("a", Severity::Deny, "y", "m"),
                violation("b", Severity::Deny, "a", "m"),
            ],
            vec![],
            false,
        );
        let keys: Vec<(&str, &str)> = report
            .violations
            .iter()
            .map(|v| (v.rule_id.as_str(), v.resource_address.as_str()))
            .collect();
        assert_eq!(keys, vec![("a", "y"), ("b", "a"), ("b", "z"), ("b", "x")]);
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.counts.deny, 3);
        assert_eq!(report.counts.warn, 1);
    }

    #[test]
    fn duplicate_rule_address_pairs_collapse() {
        let report = aggregate(
            vec![
                violation("r", Severity::Deny, "a", "second"),
                violation("r", Severity::Deny, "a", "first"),
            ],
            vec![],
            false,
        );
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].message, "first");
    }

    #[test]
    fn warn_only_passes() {
        let report = aggregate(vec![violation("r", Severity::Warn, "a", "m")], vec![], false);
        assert_eq!(report.verdict, Verdict::Pass);
    }

    #[test]
    fn interruption_wins_over_fail() {
        let report = aggregate(vec![violation("r", Severity::Deny, "a", "m")], vec![], true);
        assert_eq!(report.verdict, Verdict::Incomplete);
        assert_eq!(report.counts.deny, 1);
    }

    #[test]
    fn indeterminates_are_sorted_and_deduplicated() {
        let ind = |rule: &str, addr: &str| Indeterminate {
            rule_id: rule.to_string(),
            resource_address: addr.to_string(),
            reason: "r".to_string(),
        };
        let report = aggregate(vec![], vec![ind("b", "1"), ind("a", "2"), ind("b", "1")], false);
        assert_eq!(report.indeterminates.len(), 2);
        assert_eq!(report.indeterminates[0].rule_id, "a");
        assert_eq!(report.counts.indeterminate, 2);
        assert_eq!(report.verdict, Verdict::Pass);
    }
}
