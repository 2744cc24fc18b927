//! Tests for the value transform engine

#[cfg(test)]
mod tests {
    use opengauge_core::transform::{compute, CalibrationPoint, TransformError, TransformSpec};
    use opengauge_core::var::VarKey;

    fn airspeed_indicator() -> TransformSpec {
        TransformSpec::new(VarKey::new("AIRSPEED INDICATED", "knots"))
            .unwrap()
            .with_calibration(vec![
                CalibrationPoint::new(40.0, 20.0),
                CalibrationPoint::new(60.0, 70.0),
                CalibrationPoint::new(100.0, 160.0),
                CalibrationPoint::new(160.0, 300.0),
            ])
            .unwrap()
    }

    #[test]
    fn test_calibration_exact_at_points() {
        let spec = airspeed_indicator();
        for point in spec.calibration() {
            assert_eq!(compute(&spec, Some(point.value)), point.degrees);
        }
    }

    #[test]
    fn test_calibration_clamps_outside() {
        let spec = airspeed_indicator();
        assert_eq!(compute(&spec, Some(0.0)), 20.0);
        assert_eq!(compute(&spec, Some(-50.0)), 20.0);
        assert_eq!(compute(&spec, Some(500.0)), 300.0);
    }

    #[test]
    fn test_calibration_monotonic_between_points() {
        let spec = airspeed_indicator();
        let mut previous = compute(&spec, Some(40.0));
        let mut knots = 40.0;
        while knots <= 160.0 {
            let degrees = compute(&spec, Some(knots));
            assert!(degrees >= previous, "{} knots: {} < {}", knots, degrees, previous);
            previous = degrees;
            knots += 0.5;
        }
        assert!((compute(&spec, Some(80.0)) - 115.0).abs() < 1e-9);
    }

    #[test]
    fn test_calibration_applies_after_multiply() {
        let spec = airspeed_indicator().with_multiply(2.0).unwrap();
        assert_eq!(compute(&spec, Some(30.0)), 70.0);
    }

    #[test]
    fn test_clamped_without_wrap() {
        let spec = TransformSpec::new(VarKey::new("GENERAL ENG RPM:1", "rpm"))
            .unwrap()
            .with_output_range(-45.0, 225.0)
            .unwrap();

        for rpm in [-1000.0, -1.0, 0.0, 1500.0, 3000.0, 3001.0, 1e9] {
            let degrees = compute(&spec, Some(rpm));
            assert!((-45.0..=225.0).contains(&degrees), "{} rpm => {}", rpm, degrees);
        }
        assert_eq!(compute(&spec, Some(1e9)), 225.0);
        assert_eq!(compute(&spec, Some(1500.0)), 90.0);
    }

    #[test]
    fn test_wrap_scenario() {
        let spec = TransformSpec::new(VarKey::new("INDICATED ALTITUDE", "feet"))
            .unwrap()
            .with_input_range(0.0, 200.0)
            .unwrap()
            .with_output_range(0.0, 360.0)
            .unwrap()
            .wrapping();

        assert_eq!(compute(&spec, Some(250.0)), 90.0);
    }

    #[test]
    fn test_wrap_is_periodic() {
        let spec = TransformSpec::new(VarKey::new("INDICATED ALTITUDE", "feet"))
            .unwrap()
            .with_input_range(0.0, 1000.0)
            .unwrap()
            .with_output_range(0.0, 360.0)
            .unwrap()
            .wrapping();

        for feet in [-2500.0, -10.0, 0.0, 125.0, 999.0, 4321.5] {
            let a = compute(&spec, Some(feet));
            let b = compute(&spec, Some(feet + 1000.0));
            assert!((a - b).abs() < 1e-6, "{} ft: {} vs {}", feet, a, b);
            assert!((0.0..360.0).contains(&a));
        }
    }

    #[test]
    fn test_wrap_never_reaches_upper_bound() {
        let spec = TransformSpec::new(VarKey::new("INDICATED ALTITUDE", "feet"))
            .unwrap()
            .with_input_range(0.0, 200.0)
            .unwrap()
            .with_output_range(0.0, 360.0)
            .unwrap()
            .wrapping();

        assert_eq!(compute(&spec, Some(-1e-17)), 0.0);
        assert_eq!(compute(&spec, Some(200.0)), 0.0);
        assert!(compute(&spec, Some(-1e-9)) < 360.0);
    }

    #[test]
    fn test_unknown_unit_default_range() {
        let spec = TransformSpec::new(VarKey::new("FLAPS HANDLE PERCENT", "percent over 100"))
            .unwrap()
            .with_output_range(0.0, 1.0)
            .unwrap();
        assert_eq!(compute(&spec, Some(0.5)), 0.5);
    }

    #[test]
    fn test_unit_default_ranges() {
        let cases = [
            ("feet", 5000.0, 0.5),
            ("knots", 50.0, 0.25),
            ("rpm", 3000.0, 1.0),
            ("fpm", 0.0, 0.5),
            ("position", 127.0, 1.0),
            ("radians", 0.0, 0.5),
        ];

        for (unit, value, expected) in cases {
            let spec = TransformSpec::new(VarKey::new("X", unit))
                .unwrap()
                .with_output_range(0.0, 1.0)
                .unwrap();
            assert!(
                (compute(&spec, Some(value)) - expected).abs() < 1e-9,
                "unit {}",
                unit
            );
        }
    }

    #[test]
    fn test_invalid_specs_rejected() {
        let err = TransformSpec::new(VarKey::new("X", "feet"))
            .unwrap()
            .with_output_range(0.0, f64::INFINITY)
            .unwrap_err();
        assert_eq!(err, TransformError::NonFinite("to"));

        let err = TransformSpec::new(VarKey::new("X", "feet"))
            .unwrap()
            .with_calibration(vec![
                CalibrationPoint::new(10.0, 0.0),
                CalibrationPoint::new(5.0, 10.0),
            ])
            .unwrap_err();
        assert!(matches!(err, TransformError::UnsortedCalibration { .. }));
    }
}
