use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `infraguard.toml` schema v1.
///
/// This is a *user-facing* config model: it is intentionally permissive so forward-compat is easy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InfraguardConfigV1 {
    /// Optional schema string for tooling (`infraguard.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Change-document dialect: `native` (default), `plan`, `admission`, `build`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,

    /// Built-in rule packs to load: `cloud`, `container`, `admission`, `compliance`.
    #[serde(default)]
    pub packs: Vec<String>,

    /// Only evaluate rules from these domains (empty = all).
    #[serde(default)]
    pub domains: Vec<String>,

    /// Glob patterns over rule ids to leave out.
    #[serde(default)]
    pub exclude_rules: Vec<String>,

    /// Evaluation deadline in milliseconds; an expired deadline yields an incomplete report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,

    /// Worker threads for evaluation (default: one per core).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}
