//! Data source abstraction

use std::time::Duration;

use crate::var::VarKey;

/// Something that produces telemetry values, eg. a simulator bridge or the
/// built-in [`EmulatorSource`](super::EmulatorSource).
///
/// The server owns its source and drives it: [`step`](DataSource::step) is
/// called once per send tick with the elapsed time, then
/// [`value`](DataSource::value) is queried for every subscribed var.
pub trait DataSource: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Vehicle currently loaded, `None` when not in one
    fn vehicle_name(&self) -> Option<String>;

    /// Current value of a var, `None` if the source does not know it
    fn value(&self, key: &VarKey) -> Option<f64>;

    /// Advance the source by `dt`
    fn step(&mut self, dt: Duration);
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn vehicle_name(&self) -> Option<String> {
        (**self).vehicle_name()
    }

    fn value(&self, key: &VarKey) -> Option<f64> {
        (**self).value(key)
    }

    fn step(&mut self, dt: Duration) {
        (**self).step(dt)
    }
}
