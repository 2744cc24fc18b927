//! Arc-length sampling

use kurbo::{BezPath, ParamCurve, ParamCurveArclen, PathEl, PathSeg, Point, Rect};
use std::collections::HashMap;
use std::sync::Arc;

use super::{PathSpec, VectorPath, ARCLEN_ACCURACY};

/// A path measured once for repeated point-at-distance queries
#[derive(Debug, Clone)]
pub struct MeasuredPath {
    segments: Vec<PathSeg>,
    /// Arc length at the end of each segment
    cumulative: Vec<f64>,
    total: f64,
    center: Point,
}

impl MeasuredPath {
    /// Measure a path (already scaled to its render size).
    ///
    /// Only the first contour with a non-zero length is measured. The
    /// center is that of the control-point box of the whole path.
    pub fn measure(path: &BezPath) -> Self {
        let mut measured = Self {
            segments: Vec::new(),
            cumulative: Vec::new(),
            total: 0.0,
            center: control_box(path).center(),
        };

        for contour in contours(path) {
            measured.segments.clear();
            measured.cumulative.clear();
            measured.total = 0.0;

            for segment in contour.segments() {
                let length = segment.arclen(ARCLEN_ACCURACY);
                if length.is_finite() {
                    measured.total += length;
                }
                measured.segments.push(segment);
                measured.cumulative.push(measured.total);
            }

            if measured.total > 0.0 {
                break;
            }
        }

        measured
    }

    /// Total arc length
    pub fn length(&self) -> f64 {
        self.total
    }

    /// Center of the control-point box
    pub fn center(&self) -> Point {
        self.center
    }

    /// Point at an arc-length distance, `None` for an empty path
    pub fn point_at(&self, distance: f64) -> Option<Point> {
        if !(self.total > 0.0) || self.segments.is_empty() {
            return None;
        }

        let distance = distance.clamp(0.0, self.total);
        let index = self
            .cumulative
            .partition_point(|&end| end < distance)
            .min(self.segments.len() - 1);

        let segment = self.segments[index];
        let end = self.cumulative[index];
        let start = if index == 0 { 0.0 } else { self.cumulative[index - 1] };
        let length = end - start;

        let t = if length > 0.0 {
            segment.inv_arclen(distance - start, ARCLEN_ACCURACY)
        } else {
            0.0
        };

        let point = segment.eval(t.clamp(0.0, 1.0));
        if point.x.is_finite() && point.y.is_finite() {
            Some(point)
        } else {
            None
        }
    }
}

/// Split a path at every `MoveTo`
fn contours(path: &BezPath) -> Vec<BezPath> {
    let mut contours = Vec::new();
    let mut current = Vec::new();

    for element in path.elements() {
        if matches!(element, PathEl::MoveTo(_)) && !current.is_empty() {
            contours.push(BezPath::from_vec(std::mem::take(&mut current)));
        }
        current.push(*element);
    }

    if !current.is_empty() {
        contours.push(BezPath::from_vec(current));
    }

    contours
}

/// Box around every point of the path, control points included
fn control_box(path: &BezPath) -> Rect {
    let mut points = path.elements().iter().flat_map(|element| match *element {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => vec![p],
        PathEl::QuadTo(p1, p2) => vec![p1, p2],
        PathEl::CurveTo(p1, p2, p3) => vec![p1, p2, p3],
        PathEl::ClosePath => Vec::new(),
    });

    match points.next() {
        Some(first) => points.fold(Rect::from_points(first, first), |rect, p| rect.union_pt(p)),
        None => Rect::ZERO,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MeasureKey {
    id: String,
    width: Option<u64>,
    height: Option<u64>,
}

/// Samples positions along vector paths, caching measurements per
/// (path id, requested width, requested height)
#[derive(Debug, Default)]
pub struct PathSampler {
    measured: HashMap<MeasureKey, Arc<MeasuredPath>>,
}

impl PathSampler {
    /// Create a sampler with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the point at `normalized_value` (clamped to `[-1, 1]`)
    /// relative to the path's control-box center, plus `spec.position`
    /// resolved against the container.
    ///
    /// A zero-length path yields `(0, 0)`.
    pub fn sample(
        &mut self,
        path: &VectorPath,
        spec: &PathSpec,
        container_width: f64,
        container_height: f64,
        normalized_value: f64,
    ) -> (f64, f64) {
        let measured = self.measure(path, spec.width, spec.height);

        let value = if normalized_value.is_nan() {
            0.0
        } else {
            normalized_value.clamp(-1.0, 1.0)
        };
        let t = (value + 1.0) / 2.0;

        let point = match measured.point_at(t * measured.length()) {
            Some(point) => point,
            None => return (0.0, 0.0),
        };

        let (offset_x, offset_y) = spec.position.resolve(container_width, container_height);
        let relative = point - measured.center();

        (relative.x + offset_x, relative.y + offset_y)
    }

    /// Measure (or fetch the cached measurement of) a path at a size
    pub fn measure(
        &mut self,
        path: &VectorPath,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Arc<MeasuredPath> {
        let key = MeasureKey {
            id: path.id().to_string(),
            width: width.map(f64::to_bits),
            height: height.map(f64::to_bits),
        };

        self.measured
            .entry(key)
            .or_insert_with(|| {
                let measured = MeasuredPath::measure(&path.scaled(width, height));
                tracing::debug!(
                    "Measured path '{}' length={:.2} center={:?}",
                    path.id(),
                    measured.length(),
                    measured.center()
                );
                Arc::new(measured)
            })
            .clone()
    }

    /// Number of cached measurements
    pub fn cached_len(&self) -> usize {
        self.measured.len()
    }

    /// Forget all measurements (eg. after assets were reloaded)
    pub fn clear(&mut self) {
        self.measured.clear();
    }
}
