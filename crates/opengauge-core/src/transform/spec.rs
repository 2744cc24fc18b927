//! Transform configuration
//!
//! A [`TransformSpec`] is immutable once built. Every way of creating one
//! (the builder methods or JSON) goes through validation, so the per-frame
//! engine never has to deal with an invalid shape.

use serde::{Deserialize, Serialize};

use super::TransformError;
use crate::var::VarKey;

/// Maps a raw value to specific output degrees, for non-linear instruments
/// such as an airspeed indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Raw (post multiply/invert) value
    pub value: f64,
    /// Output at that value
    pub degrees: f64,
}

impl CalibrationPoint {
    /// Create a calibration point
    pub fn new(value: f64, degrees: f64) -> Self {
        Self { value, degrees }
    }
}

/// How a layer is driven by one telemetry var
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransformSpec", into = "RawTransformSpec")]
pub struct TransformSpec {
    var: VarKey,
    from: Option<f64>,
    to: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    invert: bool,
    multiply: Option<f64>,
    calibration: Vec<CalibrationPoint>,
    wrap: bool,
    override_value: Option<f64>,
    skip: bool,
    debug: bool,
}

impl TransformSpec {
    /// Create a pass-through transform for a var
    pub fn new(var: VarKey) -> Result<Self, TransformError> {
        if var.name.trim().is_empty() {
            return Err(TransformError::EmptyVarName);
        }

        Ok(Self {
            var,
            from: None,
            to: None,
            min: None,
            max: None,
            invert: false,
            multiply: None,
            calibration: Vec::new(),
            wrap: false,
            override_value: None,
            skip: false,
            debug: false,
        })
    }

    /// Set the expected input range of the var
    pub fn with_input_range(mut self, min: f64, max: f64) -> Result<Self, TransformError> {
        self.min = Some(finite("min", min)?);
        self.max = Some(finite("max", max)?);
        Ok(self)
    }

    /// Set the output range (degrees or pixels)
    pub fn with_output_range(mut self, from: f64, to: f64) -> Result<Self, TransformError> {
        self.from = Some(finite("from", from)?);
        self.to = Some(finite("to", to)?);
        Ok(self)
    }

    /// Multiply the raw value before mapping
    pub fn with_multiply(mut self, factor: f64) -> Result<Self, TransformError> {
        self.multiply = Some(finite("multiply", factor)?);
        Ok(self)
    }

    /// Negate the raw value before mapping
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Let the output wrap around instead of clamping (altimeter needles)
    pub fn wrapping(mut self) -> Self {
        self.wrap = true;
        self
    }

    /// Replace the live value with a fixed one, for debugging
    pub fn with_override(mut self, value: f64) -> Result<Self, TransformError> {
        self.override_value = Some(finite("override", value)?);
        Ok(self)
    }

    /// Use a calibration curve. Points must be sorted by `value`.
    pub fn with_calibration(
        mut self,
        points: Vec<CalibrationPoint>,
    ) -> Result<Self, TransformError> {
        validate_calibration(&points)?;
        self.calibration = points;
        Ok(self)
    }

    /// Mark the transform as skipped
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Enable per-frame debug logging
    pub fn debugged(mut self) -> Self {
        self.debug = true;
        self
    }

    /// The driving var
    pub fn var(&self) -> &VarKey {
        &self.var
    }

    /// Output start
    pub fn from(&self) -> Option<f64> {
        self.from
    }

    /// Output end
    pub fn to(&self) -> Option<f64> {
        self.to
    }

    /// Explicit input minimum
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Explicit input maximum
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Whether the value is negated
    pub fn invert(&self) -> bool {
        self.invert
    }

    /// Multiplier applied to the raw value
    pub fn multiply(&self) -> Option<f64> {
        self.multiply
    }

    /// Calibration curve, empty when unused
    pub fn calibration(&self) -> &[CalibrationPoint] {
        &self.calibration
    }

    /// Whether wrap mode is on
    pub fn wrap(&self) -> bool {
        self.wrap
    }

    /// Forced debug value
    pub fn override_value(&self) -> Option<f64> {
        self.override_value
    }

    /// Whether the layer should ignore this transform
    pub fn skip(&self) -> bool {
        self.skip
    }

    /// Whether debug logging is on
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// True when none of min, max, from or to is set
    pub fn is_pass_through(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.from.is_none() && self.to.is_none()
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, TransformError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TransformError::NonFinite(field))
    }
}

fn finite_opt(field: &'static str, value: Option<f64>) -> Result<Option<f64>, TransformError> {
    value.map(|v| finite(field, v)).transpose()
}

fn validate_calibration(points: &[CalibrationPoint]) -> Result<(), TransformError> {
    for point in points {
        finite("calibration.value", point.value)?;
        finite("calibration.degrees", point.degrees)?;
    }

    for pair in points.windows(2) {
        if pair[1].value < pair[0].value {
            return Err(TransformError::UnsortedCalibration {
                previous: pair[0].value,
                next: pair[1].value,
            });
        }
    }

    Ok(())
}

/// Serialized form of [`TransformSpec`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransformSpec {
    var: VarKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    invert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multiply: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calibration: Option<Vec<CalibrationPoint>>,
    #[serde(default, skip_serializing_if = "is_false")]
    wrap: bool,
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    override_value: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    skip: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    debug: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TryFrom<RawTransformSpec> for TransformSpec {
    type Error = TransformError;

    fn try_from(raw: RawTransformSpec) -> Result<Self, Self::Error> {
        let mut spec = TransformSpec::new(raw.var)?;
        spec.from = finite_opt("from", raw.from)?;
        spec.to = finite_opt("to", raw.to)?;
        spec.min = finite_opt("min", raw.min)?;
        spec.max = finite_opt("max", raw.max)?;
        spec.multiply = finite_opt("multiply", raw.multiply)?;
        spec.override_value = finite_opt("override", raw.override_value)?;
        spec.invert = raw.invert;
        spec.wrap = raw.wrap;
        spec.skip = raw.skip;
        spec.debug = raw.debug;

        let calibration = raw.calibration.unwrap_or_default();
        validate_calibration(&calibration)?;
        spec.calibration = calibration;

        Ok(spec)
    }
}

impl From<TransformSpec> for RawTransformSpec {
    fn from(spec: TransformSpec) -> Self {
        RawTransformSpec {
            var: spec.var,
            from: spec.from,
            to: spec.to,
            min: spec.min,
            max: spec.max,
            invert: spec.invert,
            multiply: spec.multiply,
            calibration: if spec.calibration.is_empty() {
                None
            } else {
                Some(spec.calibration)
            },
            wrap: spec.wrap,
            override_value: spec.override_value,
            skip: spec.skip,
            debug: spec.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gauge_definition() {
        let spec: TransformSpec = serde_json::from_str(
            r#"{
                "var": ["INDICATED ALTITUDE", "feet"],
                "from": 0, "to": 360, "min": 0, "max": 1000,
                "wrap": true
            }"#,
        )
        .unwrap();

        assert_eq!(spec.var(), &VarKey::new("INDICATED ALTITUDE", "feet"));
        assert_eq!(spec.max(), Some(1000.0));
        assert!(spec.wrap());
        assert!(!spec.is_pass_through());
    }

    #[test]
    fn test_unsorted_calibration_rejected() {
        let err = serde_json::from_str::<TransformSpec>(
            r#"{
                "var": ["AIRSPEED INDICATED", "knots"],
                "calibration": [{"value": 50, "degrees": 90}, {"value": 40, "degrees": 60}]
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sorted"));
    }

    #[test]
    fn test_empty_var_name_rejected() {
        assert_eq!(
            TransformSpec::new(VarKey::new(" ", "knots")).unwrap_err(),
            TransformError::EmptyVarName
        );
    }

    #[test]
    fn test_override_field_name() {
        let spec: TransformSpec =
            serde_json::from_str(r#"{"var": ["RPM", "rpm"], "override": 1500}"#).unwrap();
        assert_eq!(spec.override_value(), Some(1500.0));

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["override"], 1500.0);
        assert!(json.get("wrap").is_none());
    }
}
