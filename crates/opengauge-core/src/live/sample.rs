//! Timestamped samples

use std::time::Instant;

/// One timestamped observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Observed value
    pub value: f64,
    /// When it was received
    pub timestamp: Instant,
}

impl Sample {
    /// Create a sample
    pub fn new(value: f64, timestamp: Instant) -> Self {
        Self { value, timestamp }
    }
}

/// The previous and the newest sample of a var.
///
/// Pairs are replaced whole, never edited in place, so a reader sees either
/// the old pair or the new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePair {
    /// Sample before `last`
    pub prev: Sample,
    /// Newest sample
    pub last: Sample,
}

impl SamplePair {
    /// First sample of a var: zero velocity until a second one arrives
    pub fn first(sample: Sample) -> Self {
        Self {
            prev: sample,
            last: sample,
        }
    }

    /// Pair after receiving `sample`
    pub fn advance(self, sample: Sample) -> Self {
        Self {
            prev: self.last,
            last: sample,
        }
    }

    /// Value at `now`.
    ///
    /// `alpha` is the time since `last` as a fraction of the gap between the
    /// two samples, clamped to `[0, 1]`, so the value catches up with `last`
    /// over one sample interval and never overshoots it.
    pub fn interpolate(&self, now: Instant) -> f64 {
        let dt = self
            .last
            .timestamp
            .saturating_duration_since(self.prev.timestamp)
            .as_secs_f64();

        if dt <= 0.0 {
            return self.last.value;
        }

        let elapsed = now.saturating_duration_since(self.last.timestamp).as_secs_f64();
        let alpha = (elapsed / dt).clamp(0.0, 1.0);

        self.prev.value + (self.last.value - self.prev.value) * alpha
    }
}
