//! Tests for arc-length path sampling

#[cfg(test)]
mod tests {
    use kurbo::Rect;
    use opengauge_core::coordinate::FlexibleVector2;
    use opengauge_core::path::{PathSampler, PathSpec, VectorPath};

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-3 && (actual.1 - expected.1).abs() < 1e-3,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn track() -> VectorPath {
        VectorPath::from_svg("ball-track.svg", "M0,0 L100,0").unwrap()
    }

    #[test]
    fn test_endpoints_and_middle() {
        let mut sampler = PathSampler::new();
        let spec = PathSpec::new("ball-track.svg");

        assert_close(sampler.sample(&track(), &spec, 200.0, 100.0, -1.0), (50.0, 50.0));
        assert_close(sampler.sample(&track(), &spec, 200.0, 100.0, 0.0), (100.0, 50.0));
        assert_close(sampler.sample(&track(), &spec, 200.0, 100.0, 1.0), (150.0, 50.0));
    }

    #[test]
    fn test_value_clamped() {
        let mut sampler = PathSampler::new();
        let spec = PathSpec {
            position: FlexibleVector2::absolute(0.0, 0.0),
            ..PathSpec::new("ball-track.svg")
        };

        assert_close(sampler.sample(&track(), &spec, 10.0, 10.0, 7.0), (50.0, 0.0));
        assert_close(sampler.sample(&track(), &spec, 10.0, 10.0, -7.0), (-50.0, 0.0));
        assert_close(sampler.sample(&track(), &spec, 10.0, 10.0, f64::NAN), (0.0, 0.0));
    }

    #[test]
    fn test_curve_is_arc_length_parameterized() {
        // Two legs of very different length: the midpoint by distance lies
        // on the long leg
        let path = VectorPath::from_svg("elbow", "M0,0 L10,0 L10,90").unwrap();
        let spec = PathSpec {
            position: FlexibleVector2::absolute(0.0, 0.0),
            ..PathSpec::new("elbow")
        };
        let mut sampler = PathSampler::new();

        // Box center is (5, 45); halfway along is (10, 40)
        assert_close(sampler.sample(&path, &spec, 0.0, 0.0, 0.0), (5.0, -5.0));
    }

    #[test]
    fn test_zero_length_path() {
        let path = VectorPath::from_svg("dot", "M10,10").unwrap();
        let mut sampler = PathSampler::new();
        assert_eq!(
            sampler.sample(&path, &PathSpec::new("dot"), 100.0, 100.0, 0.5),
            (0.0, 0.0)
        );
    }

    #[test]
    fn test_measurement_cached_per_size() {
        let path = track()
            .with_view_box(Rect::new(0.0, 0.0, 100.0, 10.0))
            .unwrap();
        let mut sampler = PathSampler::new();

        let native = PathSpec::new("ball-track.svg");
        sampler.sample(&path, &native, 100.0, 100.0, 0.3);
        sampler.sample(&path, &native, 100.0, 100.0, -0.3);
        assert_eq!(sampler.cached_len(), 1);

        let wide = PathSpec {
            width: Some(200.0),
            position: FlexibleVector2::absolute(0.0, 0.0),
            ..PathSpec::new("ball-track.svg")
        };
        assert_close(sampler.sample(&path, &wide, 100.0, 100.0, 1.0), (100.0, 0.0));
        assert_eq!(sampler.cached_len(), 2);
        assert_eq!(sampler.measure(&path, Some(200.0), None).length(), 200.0);

        sampler.clear();
        assert_eq!(sampler.cached_len(), 0);
    }

    #[test]
    fn test_curved_track_centers_on_control_box() {
        let path = VectorPath::from_svg("arc", "M0,0 Q50,100 100,0").unwrap();
        let spec = PathSpec {
            position: FlexibleVector2::absolute(0.0, 0.0),
            ..PathSpec::new("arc")
        };
        let mut sampler = PathSampler::new();

        // Control box is (0,0)-(100,100); the curve's apex is (50, 50)
        assert_close(sampler.sample(&path, &spec, 0.0, 0.0, 0.0), (0.0, 0.0));
        assert_close(sampler.sample(&path, &spec, 0.0, 0.0, -1.0), (-50.0, -50.0));
        assert_close(sampler.sample(&path, &spec, 0.0, 0.0, 1.0), (50.0, -50.0));
    }

    #[test]
    fn test_second_contour_ignored() {
        let path = VectorPath::from_svg("double", "M0,0 L100,0 M0,50 L100,50").unwrap();
        let spec = PathSpec {
            position: FlexibleVector2::absolute(0.0, 0.0),
            ..PathSpec::new("double")
        };
        let mut sampler = PathSampler::new();

        let measured = sampler.measure(&path, None, None);
        assert!((measured.length() - 100.0).abs() < 1e-9);
        assert_close(sampler.sample(&path, &spec, 0.0, 0.0, 0.0), (0.0, -25.0));
    }
}

