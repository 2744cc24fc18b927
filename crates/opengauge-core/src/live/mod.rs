//! Live Values
//!
//! Keeps the two most recent timestamped samples of every var and produces
//! a smoothed "current value" for the render loop.

mod sample;
mod store;

pub use sample::{Sample, SamplePair};
pub use store::LiveValueStore;

use serde::{Deserialize, Serialize};

/// Which value the render path reads from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueMode {
    /// Catch-up interpolation between the last two samples
    #[default]
    Interpolated,
    /// The newest raw sample, no smoothing
    Latest,
}

impl ValueMode {
    /// Mode selected by the `interpolate` config flag
    pub fn from_interpolate(interpolate: bool) -> Self {
        if interpolate {
            ValueMode::Interpolated
        } else {
            ValueMode::Latest
        }
    }
}
