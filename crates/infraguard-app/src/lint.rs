//! The `lint` use case: report concerns whose severity differs between domains.

use crate::check::{RulesInput, load_registry};
use infraguard_domain::lint::SeverityInconsistency;
use infraguard_settings::Overrides;

#[derive(Clone, Debug)]
pub struct LintInput<'a> {
    pub config_text: &'a str,
    pub rules: Option<RulesInput<'a>>,
    pub overrides: Overrides,
}

#[derive(Clone, Debug)]
pub struct LintOutput {
    pub rules: usize,
    pub inconsistencies: Vec<SeverityInconsistency>,
}

impl LintOutput {
    pub fn exit_code(&self) -> i32 {
        if self.inconsistencies.is_empty() { 0 } else { 1 }
    }
}

pub fn run_lint(input: LintInput<'_>) -> anyhow::Result<LintOutput> {
    let (registry, _) = load_registry(input.config_text, input.rules, input.overrides)?;
    Ok(LintOutput {
        rules: registry.len(),
        inconsistencies: registry.severity_inconsistencies(),
    })
}

/// Format lint results for terminal display.
pub fn format_lint(output: &LintOutput) -> String {
    let mut out = String::new();

    if output.inconsistencies.is_empty() {
        out.push_str(&format!(
            "{} rules checked; severities are consistent across domains.\n",
            output.rules
        ));
        return out;
    }

    for inc in &output.inconsistencies {
        out.push_str(&format!("concern '{}' has mixed severities:\n", inc.concern));
        for e in &inc.entries {
            out.push_str(&format!(
                "  - {:<5} {} ({})\n",
                e.severity.as_str(),
                e.rule_id,
                e.domain
            ));
        }
    }

    out
}
