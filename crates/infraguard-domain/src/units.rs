//! Unit-aware quantity parsing.
//!
//! Every dimension has one canonical base unit and a fixed suffix table:
//!
//! | dimension  | base unit  | suffixes                                              |
//! |------------|------------|-------------------------------------------------------|
//! | `cpu`      | millicores | `n` 1e-6, `u` 1e-3, `m` 1, none 1000                  |
//! | `memory`   | bytes      | `Ki`..`Ei` (powers of 1024), `k`..`E` (powers of 1000), none 1 |
//! | `duration` | seconds    | `ms` 0.001, `s` 1, `m` 60, `h` 3600, `d` 86400, none 1 |
//!
//! Bare JSON numbers use the "none" row (a cpu value of `2` is 2000 millicores).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Cpu,
    Memory,
    Duration,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Cpu => "cpu",
            Dimension::Memory => "memory",
            Dimension::Duration => "duration",
        }
    }

    pub fn base_unit(self) -> &'static str {
        match self {
            Dimension::Cpu => "millicores",
            Dimension::Memory => "bytes",
            Dimension::Duration => "seconds",
        }
    }

    fn suffixes(self) -> &'static [(&'static str, f64)] {
        match self {
            Dimension::Cpu => CPU_SUFFIXES,
            Dimension::Memory => MEMORY_SUFFIXES,
            Dimension::Duration => DURATION_SUFFIXES,
        }
    }

    fn scale(self, suffix: &str) -> Option<f64> {
        self.suffixes()
            .iter()
            .find(|(s, _)| *s == suffix)
            .map(|(_, factor)| *factor)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CPU_SUFFIXES: &[(&str, f64)] = &[("n", 1e-6), ("u", 1e-3), ("m", 1.0), ("", 1000.0)];

const KI: f64 = 1024.0;

const MEMORY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", KI),
    ("Mi", KI * KI),
    ("Gi", KI * KI * KI),
    ("Ti", KI * KI * KI * KI),
    ("Pi", KI * KI * KI * KI * KI),
    ("Ei", KI * KI * KI * KI * KI * KI),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
    ("", 1.0),
];

const DURATION_SUFFIXES: &[(&str, f64)] = &[
    ("ms", 0.001),
    ("s", 1.0),
    ("m", 60.0),
    ("h", 3600.0),
    ("d", 86400.0),
    ("", 1.0),
];

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("cannot parse {dimension} quantity '{raw}'")]
    Unparsable { dimension: Dimension, raw: String },

    #[error("unknown {dimension} unit suffix '{suffix}' in '{raw}'")]
    UnknownSuffix {
        dimension: Dimension,
        raw: String,
        suffix: String,
    },

    #[error("negative {dimension} quantity '{raw}'")]
    Negative { dimension: Dimension, raw: String },

    #[error("expected a {dimension} quantity, found {found}")]
    NotAQuantity {
        dimension: Dimension,
        found: &'static str,
    },
}

/// Parse a suffixed quantity string into the dimension's base unit.
pub fn parse_quantity(dimension: Dimension, raw: &str) -> Result<f64, UnitError> {
    let text = raw.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, suffix) = text.split_at(split);

    if number.is_empty() {
        return Err(if text.starts_with('-') {
            UnitError::Negative {
                dimension,
                raw: raw.to_string(),
            }
        } else {
            UnitError::Unparsable {
                dimension,
                raw: raw.to_string(),
            }
        });
    }

    let value: f64 = number.parse().map_err(|_| UnitError::Unparsable {
        dimension,
        raw: raw.to_string(),
    })?;

    let factor = dimension
        .scale(suffix)
        .ok_or_else(|| UnitError::UnknownSuffix {
            dimension,
            raw: raw.to_string(),
            suffix: suffix.to_string(),
        })?;

    Ok(value * factor)
}

/// Interpret a bare number (no suffix) in the dimension's unit-less row.
pub fn quantity_from_number(dimension: Dimension, value: f64) -> Result<f64, UnitError> {
    if value < 0.0 || !value.is_finite() {
        return Err(UnitError::Negative {
            dimension,
            raw: value.to_string(),
        });
    }
    let factor = dimension.scale("").unwrap_or(1.0);
    Ok(value * factor)
}
