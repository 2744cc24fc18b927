//! Data source manager
//!
//! Wraps the active [`DataSource`] with the operator overrides: forced var
//! values, a forced vehicle name and a var "watch" that logs the next few
//! values read for it.

use std::collections::HashMap;
use std::time::Duration;

use super::DataSource;
use crate::var::VarKey;

/// Number of values logged per watch
pub const WATCH_COUNT: usize = 10;

/// Case-insensitive var key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ForcedKey {
    name: String,
    unit: String,
}

impl ForcedKey {
    fn new(key: &VarKey) -> Self {
        Self {
            name: key.name.to_lowercase(),
            unit: key.unit.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone)]
struct Watch {
    name: String,
    unit: Option<String>,
    remaining: usize,
}

impl Watch {
    fn matches(&self, key: &VarKey) -> bool {
        self.name == key.name.to_lowercase()
            && self
                .unit
                .as_ref()
                .map_or(true, |unit| *unit == key.unit.to_lowercase())
    }
}

/// The server's view of its data source
pub struct SourceManager {
    source: Box<dyn DataSource>,
    forced_vars: HashMap<ForcedKey, f64>,
    forced_vehicle: Option<String>,
    watch: Option<Watch>,
    /// Vehicle as last reported to clients
    current_vehicle: Option<String>,
}

impl SourceManager {
    /// Manage a data source
    pub fn new(source: Box<dyn DataSource>) -> Self {
        let current_vehicle = source.vehicle_name();
        Self {
            source,
            forced_vars: HashMap::new(),
            forced_vehicle: None,
            watch: None,
            current_vehicle,
        }
    }

    /// Name of the wrapped source
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Effective vehicle: the forced one, else the source's
    pub fn vehicle_name(&self) -> Option<String> {
        self.forced_vehicle
            .clone()
            .or_else(|| self.source.vehicle_name())
    }

    /// Advance the source. Returns the new vehicle when the effective
    /// vehicle changed.
    pub fn step(&mut self, dt: Duration) -> Option<Option<String>> {
        self.source.step(dt);
        self.refresh_vehicle()
    }

    /// Value for a var, forced values first
    pub fn value(&mut self, key: &VarKey) -> Option<f64> {
        let forced = self.forced_vars.get(&ForcedKey::new(key)).copied();
        let value = forced.or_else(|| self.source.value(key));

        if let Some(watch) = self.watch.as_mut() {
            if watch.matches(key) {
                tracing::info!(
                    "[WATCH] {} = {:?}{}",
                    key,
                    value,
                    if forced.is_some() { " (forced)" } else { "" }
                );
                watch.remaining -= 1;
                if watch.remaining == 0 {
                    self.watch = None;
                }
            }
        }

        value
    }

    /// Force a var to a fixed value
    pub fn force_var(&mut self, key: &VarKey, value: f64) {
        tracing::info!("Forcing var {} to {}", key, value);
        self.forced_vars.insert(ForcedKey::new(key), value);
    }

    /// Stop forcing a var. Returns whether it was forced.
    pub fn clear_forced_var(&mut self, key: &VarKey) -> bool {
        let removed = self.forced_vars.remove(&ForcedKey::new(key)).is_some();
        tracing::info!("Clear forced var {}", key);
        removed
    }

    /// Force the vehicle name. Returns the new vehicle when the effective
    /// vehicle changed.
    pub fn force_vehicle(&mut self, name: impl Into<String>) -> Option<Option<String>> {
        let name = name.into();
        tracing::info!("Forcing vehicle name '{}'", name);
        self.forced_vehicle = Some(name);
        self.refresh_vehicle()
    }

    /// Stop forcing the vehicle name
    pub fn clear_forced_vehicle(&mut self) -> Option<Option<String>> {
        tracing::info!("Clear forced vehicle name");
        self.forced_vehicle = None;
        self.refresh_vehicle()
    }

    /// Log the next [`WATCH_COUNT`] values read for a var. Without a unit
    /// every unit of the var matches.
    pub fn watch(&mut self, name: &str, unit: Option<&str>) {
        tracing::info!("Watching var '{}' ({})", name, unit.unwrap_or("any unit"));
        self.watch = Some(Watch {
            name: name.to_lowercase(),
            unit: unit.map(str::to_lowercase),
            remaining: WATCH_COUNT,
        });
    }

    /// Check if a watch is active
    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    fn refresh_vehicle(&mut self) -> Option<Option<String>> {
        let vehicle = self.vehicle_name();
        if vehicle == self.current_vehicle {
            return None;
        }

        tracing::info!("New vehicle {:?}", vehicle);
        self.current_vehicle = vehicle.clone();
        Some(vehicle)
    }
}
