use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stable schema identifier for the emitted evaluation report.
pub const SCHEMA_REPORT_V1: &str = "infraguard.report.v1";

/// Rule severity as declared by the rule author.
///
/// Variant order is the report order: `deny` sorts before `warn`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Deny,
    Warn,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Deny => "deny",
            Severity::Warn => "warn",
        }
    }
}

/// Overall outcome of one evaluation run.
///
/// `Incomplete` is reserved for cancelled runs so a truncated run is never
/// mistaken for a compliant one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    Incomplete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    /// Address of the matched resource, or `"global"` for aggregate rules.
    pub resource_address: String,
    pub message: String,
}

/// A (rule, resource) pair the engine could not decide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Indeterminate {
    pub rule_id: String,
    pub resource_address: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Counts {
    pub deny: u32,
    pub warn: u32,
    pub indeterminate: u32,
}

impl Counts {
    pub fn tally(violations: &[Violation], indeterminates: &[Indeterminate]) -> Self {
        let mut counts = Counts::default();
        for v in violations {
            match v.severity {
                Severity::Deny => counts.deny += 1,
                Severity::Warn => counts.warn += 1,
            }
        }
        counts.indeterminate = indeterminates.len() as u32;
        counts
    }
}

/// The wire report handed back to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationReport {
    pub verdict: Verdict,
    pub violations: Vec<Violation>,
    pub indeterminates: Vec<Indeterminate>,
    pub counts: Counts,
}
