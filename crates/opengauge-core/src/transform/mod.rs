//! Value Transforms
//!
//! Maps a raw telemetry sample into a rendering parameter: degrees for
//! rotating layers, pixels for translating layers, or a normalized scalar
//! for path-driven layers.
//!
//! The pipeline, in order:
//! 1. debug override replaces the sample
//! 2. multiply, then invert
//! 3. calibration curve (bypasses everything below)
//! 4. pass-through when no range or output is configured
//! 5. radian wraparound into -π..π
//! 6. unit default input range
//! 7. clamp (or wrap) into the output range

mod engine;
mod error;
mod spec;
pub mod units;

pub use engine::{compute, compute_with, interpolate_calibration};
pub use error::TransformError;
pub use spec::{CalibrationPoint, TransformSpec};
