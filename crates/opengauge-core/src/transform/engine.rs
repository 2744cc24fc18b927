//! Transform evaluation
//!
//! Pure functions, safe to call every frame. Nothing here fails: missing or
//! invalid samples degrade to 0 and degenerate ranges to the output start.

use super::units::{default_input_range, wrap_radians};
use super::{CalibrationPoint, TransformSpec};
use crate::config::RenderOptions;

/// Map a raw sample through a transform
pub fn compute(spec: &TransformSpec, raw_sample: Option<f64>) -> f64 {
    let sample = spec.override_value().or(raw_sample);

    // Non-finite samples count as "no value yet"
    let value = match sample {
        Some(v) if v.is_finite() => v,
        _ => return 0.0,
    };

    let mut value = value;

    if let Some(factor) = spec.multiply() {
        value *= factor;
    }

    if spec.invert() {
        value *= -1.0;
    }

    if !spec.calibration().is_empty() {
        return interpolate_calibration(spec.calibration(), value);
    }

    if spec.is_pass_through() {
        return value;
    }

    let unit = spec.var().unit.as_str();

    if unit == "radians" {
        value = wrap_radians(value);
    }

    let (default_min, default_max) = default_input_range(unit);
    let input_min = spec.min().unwrap_or(default_min);
    let input_max = spec.max().unwrap_or(default_max);
    let output_from = spec.from().unwrap_or(0.0);
    let output_to = spec.to().unwrap_or(1.0);

    let range = input_max - input_min;
    if range <= 0.0 {
        return output_from;
    }

    let position = (value - input_min) / range;
    let normalized = if spec.wrap() {
        let frac = position - position.floor();
        // Tiny negative positions round up to exactly 1
        if frac >= 1.0 {
            0.0
        } else {
            frac
        }
    } else {
        position.clamp(0.0, 1.0)
    };

    output_from + (output_to - output_from) * normalized
}

/// [`compute`] with diagnostics
pub fn compute_with(spec: &TransformSpec, raw_sample: Option<f64>, options: &RenderOptions) -> f64 {
    let result = compute(spec, raw_sample);

    if options.debug || spec.debug() {
        tracing::debug!(
            "Transform {} {:?} (override {:?}) => {}",
            spec.var(),
            raw_sample,
            spec.override_value(),
            result
        );
    }

    result
}

/// Piecewise-linear lookup in a calibration curve sorted by value.
///
/// Values outside the curve clamp to the first/last point's degrees.
pub fn interpolate_calibration(points: &[CalibrationPoint], value: f64) -> f64 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return value,
    };

    if value <= first.value {
        return first.degrees;
    }
    if value >= last.value {
        return last.degrees;
    }

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if value >= a.value && value <= b.value {
            let span = b.value - a.value;
            if span <= 0.0 {
                return a.degrees;
            }
            let t = (value - a.value) / span;
            return a.degrees + t * (b.degrees - a.degrees);
        }
    }

    last.degrees
}
