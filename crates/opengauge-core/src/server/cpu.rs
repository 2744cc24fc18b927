//! Host CPU usage as a data source
//!
//! Useful for trying gauges without a simulator: every var reads the
//! machine's overall CPU usage in percent.

use std::time::Duration;

use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

use super::DataSource;
use crate::var::VarKey;

/// Vehicle name reported by [`CpuSource`]
pub const CPU_VEHICLE: &str = "CPU";

/// Data source reporting system CPU usage
pub struct CpuSource {
    system: System,
    usage: f64,
    since_refresh: Duration,
}

impl Default for CpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSource {
    /// Create a source and take the first CPU measurement
    pub fn new() -> Self {
        let mut system = System::new();
        // Usage is computed between two refreshes, this one is the baseline
        system.refresh_cpu_usage();

        Self {
            system,
            usage: 0.0,
            since_refresh: Duration::ZERO,
        }
    }

    /// Last measured usage in percent
    pub fn usage(&self) -> f64 {
        self.usage
    }

    fn refresh(&mut self) {
        self.system.refresh_cpu_usage();
        let usage = f64::from(self.system.global_cpu_usage());
        if usage.is_finite() {
            self.usage = usage.clamp(0.0, 100.0);
        }
        tracing::trace!("CPU usage {:.1}%", self.usage);
    }
}

impl DataSource for CpuSource {
    fn name(&self) -> &str {
        "cpu"
    }

    fn vehicle_name(&self) -> Option<String> {
        Some(CPU_VEHICLE.to_string())
    }

    fn value(&self, _key: &VarKey) -> Option<f64> {
        Some(self.usage)
    }

    fn step(&mut self, dt: Duration) {
        self.since_refresh += dt;

        // Refreshing faster than this gives meaningless readings
        if self.since_refresh >= MINIMUM_CPU_UPDATE_INTERVAL {
            self.since_refresh = Duration::ZERO;
            self.refresh();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vehicle_and_name() {
        let source = CpuSource::new();
        assert_eq!(source.name(), "cpu");
        assert_eq!(source.vehicle_name().as_deref(), Some("CPU"));
    }

    #[test]
    fn test_usage_is_a_percentage() {
        let mut source = CpuSource::new();
        let key = VarKey::new("CPU USAGE", "percent");
        assert_eq!(source.value(&key), Some(0.0));

        for _ in 0..2 {
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
            source.step(MINIMUM_CPU_UPDATE_INTERVAL);

            let usage = source.value(&key).unwrap();
            assert!((0.0..=100.0).contains(&usage), "usage {}", usage);
            assert_eq!(source.value(&VarKey::new("ANYTHING", "feet")), Some(usage));
        }
    }

    #[test]
    fn test_refresh_waits_for_minimum_interval() {
        let mut source = CpuSource::new();
        let step = MINIMUM_CPU_UPDATE_INTERVAL / 4;

        source.step(step);
        assert_eq!(source.since_refresh, step);

        for _ in 0..3 {
            source.step(step);
        }
        assert_eq!(source.since_refresh, Duration::ZERO);
    }
}
