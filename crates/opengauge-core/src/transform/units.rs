//! Unit-aware default input ranges
//!
//! Used when a transform does not set `min`/`max` explicitly. Unit strings
//! are matched exactly as the data source spells them.

use std::f64::consts::PI;

/// Default input range for a unit, `[0, 1]` for anything unknown
pub fn default_input_range(unit: &str) -> (f64, f64) {
    match unit {
        "feet" => (0.0, 10000.0),
        "knots" => (0.0, 200.0),
        "rpm" => (0.0, 3000.0),
        "fpm" => (-2000.0, 2000.0),
        "position" => (-127.0, 127.0),
        "radians" => (-PI, PI),
        _ => (0.0, 1.0),
    }
}

/// Re-center a 0..2π angle into -π..π
pub fn wrap_radians(value: f64) -> f64 {
    if value > PI {
        value - 2.0 * PI
    } else {
        value
    }
}
