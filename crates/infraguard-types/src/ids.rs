//! Stable identifiers shared by every layer.

/// Synthetic resource address used by aggregate-scope rules.
pub const GLOBAL_ADDRESS: &str = "global";

/// Schema identifier for `infraguard.toml`.
pub const SCHEMA_CONFIG_V1: &str = "infraguard.config.v1";

/// Kind assigned to normalized container build documents.
pub const KIND_CONTAINER_BUILD: &str = "container-build";

// Built-in rule packs.
pub const PACK_CLOUD: &str = "cloud";
pub const PACK_CONTAINER: &str = "container";
pub const PACK_ADMISSION: &str = "admission";
pub const PACK_COMPLIANCE: &str = "compliance";

/// Reserved binding name for the resource a rule or helper is evaluated against.
pub const BINDING_SUBJECT: &str = "subject";
