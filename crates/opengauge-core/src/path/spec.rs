//! Path geometry and configuration

use kurbo::{Affine, BezPath, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinate::FlexibleVector2;

/// Errors raised when loading path geometry
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Invalid SVG path data for '{id}': {message}")]
    InvalidPathData { id: String, message: String },

    #[error("Invalid view box for '{id}': {width}x{height}")]
    InvalidViewBox { id: String, width: f64, height: f64 },
}

/// Vector path geometry, identified by the asset it came from
#[derive(Debug, Clone)]
pub struct VectorPath {
    id: String,
    path: BezPath,
    view_box: Option<Rect>,
}

impl VectorPath {
    /// Wrap existing geometry
    pub fn new(id: impl Into<String>, path: BezPath) -> Self {
        Self {
            id: id.into(),
            path,
            view_box: None,
        }
    }

    /// Parse the `d` attribute of an SVG `<path>` element
    pub fn from_svg(id: impl Into<String>, data: &str) -> Result<Self, PathError> {
        let id = id.into();
        let path = BezPath::from_svg(data.trim()).map_err(|e| PathError::InvalidPathData {
            id: id.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::new(id, path))
    }

    /// Set the view box the path coordinates are expressed in
    pub fn with_view_box(mut self, view_box: Rect) -> Result<Self, PathError> {
        if !(view_box.width() > 0.0 && view_box.height() > 0.0) {
            return Err(PathError::InvalidViewBox {
                id: self.id,
                width: view_box.width(),
                height: view_box.height(),
            });
        }
        self.view_box = Some(view_box);
        Ok(self)
    }

    /// Asset identity, used as a cache key
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw geometry in view-box units
    pub fn path(&self) -> &BezPath {
        &self.path
    }

    /// View box, if known
    pub fn view_box(&self) -> Option<Rect> {
        self.view_box
    }

    /// Geometry scaled to a requested size.
    ///
    /// Without a view box, or when a dimension is not requested (or equals
    /// the view box), that axis keeps its native scale.
    pub fn scaled(&self, width: Option<f64>, height: Option<f64>) -> BezPath {
        let mut path = self.path.clone();

        if let Some(view_box) = self.view_box {
            let scale_x = axis_scale(width, view_box.width());
            let scale_y = axis_scale(height, view_box.height());
            if scale_x != 1.0 || scale_y != 1.0 {
                path.apply_affine(Affine::scale_non_uniform(scale_x, scale_y));
            }
        }

        path
    }
}

fn axis_scale(requested: Option<f64>, native: f64) -> f64 {
    match requested {
        Some(target) if target.is_finite() && target != 0.0 && target != native => target / native,
        _ => 1.0,
    }
}

/// Path-driven layer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSpec {
    /// Path asset reference (an SVG containing a single path)
    pub image: String,
    /// Requested width of the path in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Requested height of the path in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Origin of the path asset for positioning
    #[serde(default = "FlexibleVector2::center")]
    pub origin: FlexibleVector2,
    /// Offset added to the sampled point, resolved against the container
    #[serde(default = "FlexibleVector2::center")]
    pub position: FlexibleVector2,
}

impl PathSpec {
    /// A spec with centered origin and position
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            width: None,
            height: None,
            origin: FlexibleVector2::center(),
            position: FlexibleVector2::center(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_data() {
        assert!(VectorPath::from_svg("broken", "M 0 0 X 5 5").is_err());
    }

    #[test]
    fn test_scaled_to_requested_size() {
        use kurbo::Shape;

        let path = VectorPath::from_svg("line", "M0,0 L100,0")
            .unwrap()
            .with_view_box(Rect::new(0.0, 0.0, 100.0, 50.0))
            .unwrap();

        let scaled = path.scaled(Some(200.0), None);
        assert_eq!(scaled.bounding_box().width(), 200.0);

        let native = path.scaled(Some(100.0), Some(50.0));
        assert_eq!(native.bounding_box().width(), 100.0);
    }

    #[test]
    fn test_spec_defaults_to_center() {
        let spec: PathSpec = serde_json::from_str(r#"{"image": "ball-track.svg"}"#).unwrap();
        assert_eq!(spec.position, FlexibleVector2::center());
        assert_eq!(spec.origin, FlexibleVector2::center());
    }
}
