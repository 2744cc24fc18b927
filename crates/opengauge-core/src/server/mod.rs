//! Gauge Server
//!
//! Serves values from a [`DataSource`] to gauge clients over the streaming
//! protocol. Clients send `init` with the vehicle their gauges were built
//! for and the vars they need; the server answers `init` (or `reInit` when
//! the vehicle does not match) and then pushes every subscribed var once
//! per tick.

pub mod commands;
mod cpu;
mod emulator;
mod listener;
mod manager;
mod source;

pub use commands::{CommandError, ConsoleCommand};
pub use cpu::{CpuSource, CPU_VEHICLE};
pub use emulator::{EmulatorSource, AIRCRAFT_TITLES};
pub use listener::{GaugeServer, ServerHandle, CLIENT_QUEUE_CAPACITY};
pub use manager::{SourceManager, WATCH_COUNT};
pub use source::DataSource;

/// Create a data source by its config name
pub fn create_source(name: &str) -> Option<Box<dyn DataSource>> {
    match name.to_lowercase().as_str() {
        "emulator" => Some(Box::new(EmulatorSource::new())),
        "cpu" => Some(Box::new(CpuSource::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_source_by_name() {
        assert_eq!(create_source("Emulator").map(|s| s.name().to_string()).as_deref(), Some("emulator"));
        assert_eq!(create_source("Cpu").map(|s| s.name().to_string()).as_deref(), Some("cpu"));
        assert!(create_source("msfs").is_none());
    }
}
