//! Vector Paths
//!
//! Places a layer along a curved track. A normalized value in `[-1, 1]` is
//! mapped to a distance along the path's arc length and converted to an
//! offset from the center of the path's control-point box.

mod sampler;
mod spec;

pub use sampler::{MeasuredPath, PathSampler};
pub use spec::{PathError, PathSpec, VectorPath};

/// Accuracy used for arc-length measurement and inversion
pub const ARCLEN_ACCURACY: f64 = 1e-4;
