//! Config parsing, rule sources, and built-in rule packs.
//!
//! This crate is intentionally IO-free: it parses and resolves configuration and rule text
//! provided as strings.

#![forbid(unsafe_code)]

mod model;
mod presets;
mod resolve;
mod rules;

pub use model::InfraguardConfigV1;
pub use presets::{PACKS, assemble_rule_source, builtin_pack, library};
pub use resolve::{EffectiveConfig, Overrides, ResolvedConfig, RuleSelection};
pub use rules::{RuleFormat, parse_rule_source};

/// Parse `infraguard.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<InfraguardConfigV1> {
    let cfg: InfraguardConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective config used by the engine (config file + command-line overrides).
pub fn resolve_config(
    cfg: InfraguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
