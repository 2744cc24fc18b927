//! Telemetry variable keys
//!
//! A variable is identified by its name *and* unit: the same physical
//! quantity can be requested in several units and each is tracked separately.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A (name, unit) pair identifying one telemetry quantity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarKey {
    /// Variable name as the data source knows it, eg. "AIRSPEED INDICATED"
    pub name: String,
    /// Unit the value is requested in, eg. "knots"
    pub unit: String,
}

impl VarKey {
    /// Create a new key
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.unit)
    }
}

/// Gauge definitions write keys as `["NAME", "unit"]`, the wire uses objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVarKey {
    Pair(String, String),
    Object { name: String, unit: String },
}

impl<'de> Deserialize<'de> for VarKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawVarKey::deserialize(deserializer)? {
            RawVarKey::Pair(name, unit) => VarKey { name, unit },
            RawVarKey::Object { name, unit } => VarKey { name, unit },
        })
    }
}
