//! Layer composition
//!
//! Turns one gauge layer's definition plus the current var values into the
//! 2D affine transform the compositor draws it with. Points are mapped in
//! this order:
//!
//! 1. translate by minus the layer origin
//! 2. rotate by the computed angle (plus the layer's initial rotation)
//! 3. translate to the layer position plus the computed offsets
//! 4. translate by the path offset, for path-driven layers

use kurbo::{Affine, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::RenderOptions;
use crate::coordinate::{DimensionCache, FlexibleDimension, FlexibleVector2, Vector2Cache};
use crate::path::{PathSampler, PathSpec, VectorPath};
use crate::transform::{compute_with, TransformError, TransformSpec};
use crate::var::VarKey;

/// A transform that moves a layer along a vector path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTransform {
    /// Which var drives the layer and how it is mapped to `[-1, 1]`
    #[serde(flatten)]
    pub transform: TransformSpec,
    /// The path and where it sits in the gauge
    #[serde(flatten)]
    pub path: PathSpec,
}

/// Var-driven transforms of a layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawLayerTransforms")]
pub struct LayerTransforms {
    /// Rotation in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<TransformSpec>,
    /// Horizontal offset in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_x: Option<TransformSpec>,
    /// Vertical offset in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_y: Option<TransformSpec>,
    /// Position along a path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathTransform>,
}

impl LayerTransforms {
    /// Check the transforms fit their role. Wrapping only makes sense for
    /// rotation.
    pub fn validate(&self) -> Result<(), TransformError> {
        let offsets = [
            self.translate_x.as_ref(),
            self.translate_y.as_ref(),
            self.path.as_ref().map(|p| &p.transform),
        ];

        if offsets.into_iter().flatten().any(TransformSpec::wrap) {
            return Err(TransformError::WrapNotSupported);
        }

        Ok(())
    }

    /// Every var these transforms read, for the `init` subscription
    pub fn vars(&self) -> Vec<VarKey> {
        let mut vars: Vec<VarKey> = [
            self.rotate.as_ref(),
            self.translate_x.as_ref(),
            self.translate_y.as_ref(),
            self.path.as_ref().map(|p| &p.transform),
        ]
        .into_iter()
        .flatten()
        .filter(|spec| !spec.skip())
        .map(|spec| spec.var().clone())
        .collect();

        vars.sort();
        vars.dedup();
        vars
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLayerTransforms {
    #[serde(default)]
    rotate: Option<TransformSpec>,
    #[serde(default)]
    translate_x: Option<TransformSpec>,
    #[serde(default)]
    translate_y: Option<TransformSpec>,
    #[serde(default)]
    path: Option<PathTransform>,
}

impl TryFrom<RawLayerTransforms> for LayerTransforms {
    type Error = TransformError;

    fn try_from(raw: RawLayerTransforms) -> Result<Self, Self::Error> {
        let transforms = LayerTransforms {
            rotate: raw.rotate,
            translate_x: raw.translate_x,
            translate_y: raw.translate_y,
            path: raw.path,
        };
        transforms.validate()?;
        Ok(transforms)
    }
}

/// Resolution memos of a layer's flexible coordinates
#[derive(Debug, Clone, Default)]
struct LayerCaches {
    width: DimensionCache,
    height: DimensionCache,
    origin: Vector2Cache,
    position: Vector2Cache,
}

/// Geometry and transforms of one gauge layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Layer width, defaults to the gauge width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<FlexibleDimension>,
    /// Layer height, defaults to the gauge height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<FlexibleDimension>,
    /// Pivot of all transformations, resolved against the layer size
    #[serde(default = "FlexibleVector2::center")]
    pub origin: FlexibleVector2,
    /// Where the origin sits in the gauge, resolved against the gauge size
    #[serde(default = "FlexibleVector2::center")]
    pub position: FlexibleVector2,
    /// Var-driven transforms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<LayerTransforms>,
    /// Initial rotation in degrees
    #[serde(default)]
    pub rotate: f64,
    /// Initial horizontal offset
    #[serde(default)]
    pub translate_x: f64,
    /// Initial vertical offset
    #[serde(default)]
    pub translate_y: f64,
    /// Do not draw this layer
    #[serde(default)]
    pub skip: bool,
    /// Log computed values every frame
    #[serde(default)]
    pub debug: bool,
    #[serde(skip)]
    caches: LayerCaches,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            name: None,
            width: None,
            height: None,
            origin: FlexibleVector2::center(),
            position: FlexibleVector2::center(),
            transform: None,
            rotate: 0.0,
            translate_x: 0.0,
            translate_y: 0.0,
            skip: false,
            debug: false,
            caches: LayerCaches::default(),
        }
    }
}

/// Everything a layer needs from the outside to compute a frame
pub struct FrameContext<'a> {
    /// Gauge width in pixels
    pub gauge_width: f64,
    /// Gauge height in pixels
    pub gauge_height: f64,
    /// Current value of a var, usually backed by the live value store
    pub values: &'a dyn Fn(&VarKey) -> Option<f64>,
    /// Loaded path assets by image reference
    pub paths: &'a HashMap<String, VectorPath>,
    /// Shared path measurement cache
    pub sampler: &'a mut PathSampler,
    /// Render settings
    pub options: RenderOptions,
}

/// Computed placement of a layer for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerFrame {
    /// Total rotation in degrees
    pub rotation_degrees: f64,
    /// Total translate offset (computed plus initial)
    pub offset: (f64, f64),
    /// Resolved origin
    pub origin: (f64, f64),
    /// Resolved position
    pub position: (f64, f64),
    /// Offset from the path transform, if any
    pub path_offset: Option<(f64, f64)>,
    /// Final layer-to-gauge transform
    pub transform: Affine,
}

impl Layer {
    /// Compute this frame's placement. `None` when the layer is skipped.
    pub fn compute_frame(&mut self, ctx: &mut FrameContext<'_>) -> Option<LayerFrame> {
        if self.skip {
            return None;
        }

        let use_cache = ctx.options.use_cache;
        let (gauge_width, gauge_height) = (ctx.gauge_width, ctx.gauge_height);

        let layer_width = match &self.width {
            Some(width) => self.caches.width.resolve(width, gauge_width, use_cache),
            None => gauge_width,
        };
        let layer_height = match &self.height {
            Some(height) => self.caches.height.resolve(height, gauge_height, use_cache),
            None => gauge_height,
        };

        let origin = self
            .caches
            .origin
            .resolve(&self.origin, layer_width, layer_height, use_cache);
        let position = self
            .caches
            .position
            .resolve(&self.position, gauge_width, gauge_height, use_cache);

        let mut rotation = 0.0;
        let mut offset_x = 0.0;
        let mut offset_y = 0.0;
        let mut path_offset = None;

        if let Some(transforms) = &self.transform {
            if let Some(spec) = active(&transforms.rotate) {
                rotation = evaluate(spec, ctx);
            }
            if let Some(spec) = active(&transforms.translate_x) {
                offset_x = evaluate(spec, ctx);
            }
            if let Some(spec) = active(&transforms.translate_y) {
                offset_y = evaluate(spec, ctx);
            }
            if let Some(path) = transforms.path.as_ref().filter(|p| !p.transform.skip()) {
                path_offset = sample_path(path, ctx);
            }
        }

        rotation += self.rotate;
        offset_x += self.translate_x;
        offset_y += self.translate_y;

        let mut transform = Affine::translate(Vec2::new(position.0 + offset_x, position.1 + offset_y))
            * Affine::rotate(rotation.to_radians())
            * Affine::translate(Vec2::new(-origin.0, -origin.1));

        if let Some((x, y)) = path_offset {
            transform = Affine::translate(Vec2::new(x, y)) * transform;
        }

        if self.debug || ctx.options.debug {
            tracing::debug!(
                "Layer {:?} rotate={:.1} offset=({:.1},{:.1}) path={:?} pos={:?} origin={:?}",
                self.name,
                rotation,
                offset_x,
                offset_y,
                path_offset,
                position,
                origin
            );
        }

        Some(LayerFrame {
            rotation_degrees: rotation,
            offset: (offset_x, offset_y),
            origin,
            position,
            path_offset,
            transform,
        })
    }

    /// Forget cached coordinate resolutions (eg. after editing the layer)
    pub fn invalidate(&mut self) {
        self.caches = LayerCaches::default();
    }
}

fn active(spec: &Option<TransformSpec>) -> Option<&TransformSpec> {
    spec.as_ref().filter(|spec| !spec.skip())
}

fn evaluate(spec: &TransformSpec, ctx: &FrameContext<'_>) -> f64 {
    let raw = (ctx.values)(spec.var());
    compute_with(spec, raw, &ctx.options)
}

fn sample_path(path: &PathTransform, ctx: &mut FrameContext<'_>) -> Option<(f64, f64)> {
    let paths = ctx.paths;
    let geometry = match paths.get(&path.path.image) {
        Some(geometry) => geometry,
        None => {
            tracing::warn!("Path image '{}' is not loaded", path.path.image);
            return None;
        }
    };

    let normalized = evaluate(&path.transform, ctx);
    Some(ctx.sampler.sample(
        geometry,
        &path.path,
        ctx.gauge_width,
        ctx.gauge_height,
        normalized,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn no_values(_: &VarKey) -> Option<f64> {
        None
    }

    fn assert_point(actual: Point, x: f64, y: f64) {
        assert!(
            (actual.x - x).abs() < 1e-9 && (actual.y - y).abs() < 1e-9,
            "expected ({}, {}), got {:?}",
            x,
            y,
            actual
        );
    }

    #[test]
    fn test_static_layer_centered() {
        let mut layer = Layer::default();
        let paths = HashMap::new();
        let mut sampler = PathSampler::new();
        let mut ctx = FrameContext {
            gauge_width: 200.0,
            gauge_height: 100.0,
            values: &no_values,
            paths: &paths,
            sampler: &mut sampler,
            options: RenderOptions::default(),
        };

        let frame = layer.compute_frame(&mut ctx).unwrap();
        assert_eq!(frame.origin, (100.0, 50.0));
        assert_eq!(frame.position, (100.0, 50.0));
        // Layer origin lands on the layer position
        assert_point(frame.transform * Point::new(100.0, 50.0), 100.0, 50.0);
    }

    #[test]
    fn test_rotation_about_origin() {
        let mut layer: Layer = serde_json::from_str(
            r#"{
                "width": 20, "height": 100,
                "origin": ["50%", "90%"],
                "position": ["50%", "50%"],
                "transform": {
                    "rotate": {"var": ["AIRSPEED INDICATED", "knots"], "from": 0, "to": 180, "max": 100}
                }
            }"#,
        )
        .unwrap();

        let values = |key: &VarKey| (key.name == "AIRSPEED INDICATED").then_some(50.0);
        let paths = HashMap::new();
        let mut sampler = PathSampler::new();
        let mut ctx = FrameContext {
            gauge_width: 200.0,
            gauge_height: 200.0,
            values: &values,
            paths: &paths,
            sampler: &mut sampler,
            options: RenderOptions::default(),
        };

        let frame = layer.compute_frame(&mut ctx).unwrap();
        assert!((frame.rotation_degrees - 90.0).abs() < 1e-9);

        // The pivot stays on the gauge center, the needle tip swings right
        assert_point(frame.transform * Point::new(10.0, 90.0), 100.0, 100.0);
        assert_point(frame.transform * Point::new(10.0, 0.0), 190.0, 100.0);
    }

    #[test]
    fn test_skip() {
        let mut layer = Layer {
            skip: true,
            ..Default::default()
        };
        let paths = HashMap::new();
        let mut sampler = PathSampler::new();
        let mut ctx = FrameContext {
            gauge_width: 10.0,
            gauge_height: 10.0,
            values: &no_values,
            paths: &paths,
            sampler: &mut sampler,
            options: RenderOptions::default(),
        };
        assert!(layer.compute_frame(&mut ctx).is_none());
    }

    #[test]
    fn test_wrap_on_translate_rejected() {
        let err = serde_json::from_str::<LayerTransforms>(
            r#"{"translateX": {"var": ["INDICATED ALTITUDE", "feet"], "from": 0, "to": 10, "wrap": true}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("rotat"));
    }
}
