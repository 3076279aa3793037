use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One proposed or existing infrastructure object, normalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceChange {
    pub kind: String,
    /// Unique within a snapshot.
    pub address: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ResourceChange {
    pub fn new(kind: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            address: address.into(),
            attributes: Map::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// External change-document dialects understood by the normalizer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Already-normalized `{kind, address, attributes, tags}` objects.
    #[default]
    Native,
    /// Plan-style `resource_changes` with `change.after` state.
    Plan,
    /// Orchestration admission objects (`kind` + `metadata` + `spec`).
    Admission,
    /// Parsed container build instructions.
    Build,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Native,
        Dialect::Plan,
        Dialect::Admission,
        Dialect::Build,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Native => "native",
            Dialect::Plan => "plan",
            Dialect::Admission => "admission",
            Dialect::Build => "build",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownDialect(pub String);

impl fmt::Display for UnknownDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown dialect: {} (expected native|plan|admission|build)",
            self.0
        )
    }
}

impl std::error::Error for UnknownDialect {}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownDialect(s.to_string()))
    }
}
