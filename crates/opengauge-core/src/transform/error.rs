//! Transform errors

use thiserror::Error;

/// Errors raised when building a transform with an invalid shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Transform var name is empty")]
    EmptyVarName,

    #[error("Calibration points must be sorted by value: {previous} is followed by {next}")]
    UnsortedCalibration { previous: f64, next: f64 },

    #[error("Field '{0}' must be a finite number")]
    NonFinite(&'static str),

    #[error("Wrap is only supported on rotate transforms")]
    WrapNotSupported,
}
