//! Rule-author lints. These never change how rules are evaluated.

use crate::registry::Rule;
use infraguard_types::Severity;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LintEntry {
    pub rule_id: String,
    pub domain: String,
    pub severity: Severity,
}

/// Rules sharing a `concern` across domains that disagree on severity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeverityInconsistency {
    pub concern: String,
    pub entries: Vec<LintEntry>,
}

pub fn severity_inconsistencies(rules: &[Rule]) -> Vec<SeverityInconsistency> {
    let mut by_concern: BTreeMap<&str, Vec<&Rule>> = BTreeMap::new();
    for r in rules {
        if let Some(concern) = r.concern.as_deref() {
            by_concern.entry(concern).or_default().push(r);
        }
    }

    let mut out = Vec::new();
    for (concern, members) in by_concern {
        let domains: BTreeSet<&str> = members.iter().map(|r| r.domain.as_str()).collect();
        let severities: BTreeSet<Severity> = members.iter().map(|r| r.severity).collect();
        if domains.len() < 2 || severities.len() < 2 {
            continue;
        }
        let mut entries: Vec<LintEntry> = members
            .into_iter()
            .map(|r| LintEntry {
                rule_id: r.id.clone(),
                domain: r.domain.clone(),
                severity: r.severity,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.domain
                .cmp(&b.domain)
                .then(a.severity.cmp(&b.severity))
                .then(a.rule_id.cmp(&b.rule_id))
        });
        out.push(SeverityInconsistency {
            concern: concern.to_string(),
            entries,
        });
    }
    out
}
