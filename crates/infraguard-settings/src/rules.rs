use anyhow::Context;
use infraguard_domain::RuleSource;

/// Textual syntax of a rule source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleFormat {
    Toml,
    Json,
}

impl RuleFormat {
    /// Pick a format from a file extension; anything but `json` is read as TOML.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some(e) if e.eq_ignore_ascii_case("json") => RuleFormat::Json,
            _ => RuleFormat::Toml,
        }
    }
}

/// Parse `[[helper]]` / `[[rule]]` tables (TOML) or `{"helpers": [...], "rules": [...]}` (JSON).
pub fn parse_rule_source(text: &str, format: RuleFormat) -> anyhow::Result<RuleSource> {
    match format {
        RuleFormat::Toml => toml::from_str(text).context("parse TOML rule source"),
        RuleFormat::Json => serde_json::from_str(text).context("parse JSON rule source"),
    }
}
