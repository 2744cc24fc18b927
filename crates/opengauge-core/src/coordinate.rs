//! Flexible coordinates
//!
//! A coordinate axis is either an absolute pixel value or a percentage of
//! the containing element. Negative values of either kind are measured from
//! the far edge, so `-10` on a 200px container resolves to `190` and `"-25%"`
//! resolves to `150`.
//!
//! Raw values are parsed once into [`FlexibleValue`]. Caching of resolved
//! values lives in separate memo structs ([`Vector2Cache`],
//! [`DimensionCache`]) owned by whoever renders with them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One axis of a flexible coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlexibleValue {
    /// Percentage of the container size, eg. `50.0` for `"50%"`
    Percent(f64),
    /// Absolute pixels
    Absolute(f64),
}

impl Default for FlexibleValue {
    fn default() -> Self {
        FlexibleValue::Absolute(0.0)
    }
}

impl From<f64> for FlexibleValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            FlexibleValue::Absolute(value)
        } else {
            FlexibleValue::default()
        }
    }
}

impl FlexibleValue {
    /// Parse `"NN%"` or a plain number. Anything else becomes `Absolute(0)`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some(number) = trimmed.strip_suffix('%') {
            if let Ok(p) = number.trim().parse::<f64>() {
                if p.is_finite() {
                    return FlexibleValue::Percent(p);
                }
            }
        } else if let Ok(v) = trimmed.parse::<f64>() {
            return FlexibleValue::from(v);
        }

        tracing::warn!("Unparseable coordinate '{}', using 0", raw);
        FlexibleValue::default()
    }

    /// Resolve against a container size
    pub fn resolve(self, total: f64) -> f64 {
        match self {
            FlexibleValue::Percent(p) => {
                let pct = p / 100.0;
                if pct >= 0.0 {
                    pct * total
                } else {
                    total + pct * total
                }
            }
            FlexibleValue::Absolute(v) => {
                if v >= 0.0 {
                    v
                } else {
                    total + v
                }
            }
        }
    }

    /// Check if this is a percentage
    pub fn is_percent(&self) -> bool {
        matches!(self, FlexibleValue::Percent(_))
    }
}

impl fmt::Display for FlexibleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlexibleValue::Percent(p) => write!(f, "{}%", p),
            FlexibleValue::Absolute(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for FlexibleValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawValue::deserialize(deserializer)? {
            RawValue::Number(v) => FlexibleValue::from(v),
            RawValue::Text(s) => FlexibleValue::parse(&s),
        })
    }
}

impl Serialize for FlexibleValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FlexibleValue::Percent(_) => serializer.serialize_str(&self.to_string()),
            FlexibleValue::Absolute(v) => serializer.serialize_f64(*v),
        }
    }
}

/// A 2D flexible coordinate, written as `[x, y]` in gauge definitions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(FlexibleValue, FlexibleValue)", into = "(FlexibleValue, FlexibleValue)")]
pub struct FlexibleVector2 {
    /// Horizontal axis, resolved against the container width
    pub x: FlexibleValue,
    /// Vertical axis, resolved against the container height
    pub y: FlexibleValue,
}

impl From<(FlexibleValue, FlexibleValue)> for FlexibleVector2 {
    fn from((x, y): (FlexibleValue, FlexibleValue)) -> Self {
        Self { x, y }
    }
}

impl From<FlexibleVector2> for (FlexibleValue, FlexibleValue) {
    fn from(v: FlexibleVector2) -> Self {
        (v.x, v.y)
    }
}

impl FlexibleVector2 {
    /// Create from two axis values
    pub fn new(x: FlexibleValue, y: FlexibleValue) -> Self {
        Self { x, y }
    }

    /// Both axes as percentages
    pub fn percent(x: f64, y: f64) -> Self {
        Self::new(FlexibleValue::Percent(x), FlexibleValue::Percent(y))
    }

    /// Both axes in pixels
    pub fn absolute(x: f64, y: f64) -> Self {
        Self::new(FlexibleValue::from(x), FlexibleValue::from(y))
    }

    /// The container center, `["50%", "50%"]`
    pub fn center() -> Self {
        Self::percent(50.0, 50.0)
    }

    /// Resolve both axes without caching
    pub fn resolve(&self, width: f64, height: f64) -> (f64, f64) {
        (self.x.resolve(width), self.y.resolve(height))
    }
}

impl fmt::Display for FlexibleVector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Memo of the last resolution of a [`FlexibleVector2`]
#[derive(Debug, Clone, Default)]
pub struct Vector2Cache {
    entry: Option<Vector2Entry>,
}

#[derive(Debug, Clone, Copy)]
struct Vector2Entry {
    raw: FlexibleVector2,
    width: f64,
    height: f64,
    resolved: (f64, f64),
}

impl Vector2Cache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `raw` against the container.
    ///
    /// With `use_cache` the stored result is returned while both the raw
    /// value and the container size are unchanged; otherwise it is
    /// recomputed and stored. Without `use_cache` the value is computed
    /// fresh and the cache is left untouched.
    pub fn resolve(
        &mut self,
        raw: &FlexibleVector2,
        width: f64,
        height: f64,
        use_cache: bool,
    ) -> (f64, f64) {
        if !use_cache {
            return raw.resolve(width, height);
        }

        if let Some(entry) = &self.entry {
            if entry.raw == *raw && entry.width == width && entry.height == height {
                return entry.resolved;
            }
        }

        let resolved = raw.resolve(width, height);
        self.entry = Some(Vector2Entry {
            raw: *raw,
            width,
            height,
            resolved,
        });
        resolved
    }

    /// Drop the cached value
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Check if a value is cached
    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }
}

/// A single-axis flexible size or position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlexibleDimension(pub FlexibleValue);

impl FlexibleDimension {
    /// Resolve without caching
    pub fn resolve(&self, total: f64) -> f64 {
        self.0.resolve(total)
    }
}

impl From<f64> for FlexibleDimension {
    fn from(value: f64) -> Self {
        FlexibleDimension(FlexibleValue::from(value))
    }
}

/// Memo of the last resolution of a [`FlexibleDimension`]
#[derive(Debug, Clone, Default)]
pub struct DimensionCache {
    entry: Option<(FlexibleDimension, f64, f64)>,
}

impl DimensionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `raw` against `total`, same rules as [`Vector2Cache::resolve`]
    pub fn resolve(&mut self, raw: &FlexibleDimension, total: f64, use_cache: bool) -> f64 {
        if !use_cache {
            return raw.resolve(total);
        }

        if let Some((cached_raw, cached_total, resolved)) = self.entry {
            if cached_raw == *raw && cached_total == total {
                return resolved;
            }
        }

        let resolved = raw.resolve(total);
        self.entry = Some((*raw, total, resolved));
        resolved
    }

    /// Drop the cached value
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(FlexibleValue::parse("50%"), FlexibleValue::Percent(50.0));
        assert_eq!(FlexibleValue::parse(" -25% "), FlexibleValue::Percent(-25.0));
        assert_eq!(FlexibleValue::parse("12.5"), FlexibleValue::Absolute(12.5));
        assert_eq!(FlexibleValue::parse("abc"), FlexibleValue::Absolute(0.0));
        assert_eq!(FlexibleValue::parse("x%"), FlexibleValue::Absolute(0.0));
        assert_eq!(FlexibleValue::parse("NaN"), FlexibleValue::Absolute(0.0));
    }

    #[test]
    fn test_negative_percent_from_far_edge() {
        assert_eq!(FlexibleValue::Percent(-25.0).resolve(200.0), 150.0);
    }

    #[test]
    fn test_display_round_trips_percent() {
        let v = FlexibleValue::Percent(50.0);
        assert_eq!(FlexibleValue::parse(&v.to_string()), v);
    }
}
