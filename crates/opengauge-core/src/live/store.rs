//! Shared store of live samples

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use super::{Sample, SamplePair, ValueMode};
use crate::var::VarKey;

/// Latest samples of every var received from the stream.
///
/// Written by the protocol read loop, read by the render loop. The key map
/// is only write-locked when a var is seen for the first time; after that
/// each key has its own lock around an immutable [`SamplePair`], so readers
/// never see a half-updated pair and never wait on other keys.
#[derive(Debug, Default)]
pub struct LiveValueStore {
    values: RwLock<HashMap<VarKey, Arc<Mutex<SamplePair>>>>,
}

impl LiveValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample received at `now`.
    ///
    /// Non-finite values are ignored.
    pub fn ingest(&self, key: &VarKey, value: f64, now: Instant) {
        if !value.is_finite() {
            tracing::debug!("Ignoring non-finite sample for {}: {}", key, value);
            return;
        }

        let sample = Sample::new(value, now);

        if let Some(slot) = self.slot(key) {
            if let Ok(mut pair) = slot.lock() {
                *pair = pair.advance(sample);
            }
            return;
        }

        if let Ok(mut values) = self.values.write() {
            match values.get(key) {
                // Another writer inserted it between our read and write lock
                Some(slot) => {
                    if let Ok(mut pair) = slot.lock() {
                        *pair = pair.advance(sample);
                    }
                }
                None => {
                    values.insert(key.clone(), Arc::new(Mutex::new(SamplePair::first(sample))));
                }
            }
        }
    }

    /// Smoothed value at the current instant
    pub fn interpolated(&self, key: &VarKey) -> Option<f64> {
        self.interpolated_at(key, Instant::now())
    }

    /// Smoothed value at a caller-supplied instant
    pub fn interpolated_at(&self, key: &VarKey, now: Instant) -> Option<f64> {
        self.pair(key).map(|pair| pair.interpolate(now))
    }

    /// Newest raw sample
    pub fn latest(&self, key: &VarKey) -> Option<f64> {
        self.pair(key).map(|pair| pair.last.value)
    }

    /// Value according to `mode`
    pub fn value(&self, key: &VarKey, mode: ValueMode) -> Option<f64> {
        match mode {
            ValueMode::Interpolated => self.interpolated(key),
            ValueMode::Latest => self.latest(key),
        }
    }

    /// Both samples of a var
    pub fn pair(&self, key: &VarKey) -> Option<SamplePair> {
        let slot = self.slot(key)?;
        let pair = slot.lock().ok()?;
        Some(*pair)
    }

    /// All keys that have received at least one sample
    pub fn keys(&self) -> Vec<VarKey> {
        self.values
            .read()
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.values.read().map(|values| values.len()).unwrap_or(0)
    }

    /// Check if no sample was received yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &VarKey) -> Option<Arc<Mutex<SamplePair>>> {
        self.values.read().ok()?.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn rpm() -> VarKey {
        VarKey::new("GENERAL ENG RPM:1", "rpm")
    }

    #[test]
    fn test_unknown_key_is_absent() {
        let store = LiveValueStore::new();
        assert_eq!(store.interpolated(&rpm()), None);
        assert_eq!(store.latest(&rpm()), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_catch_up_between_samples() {
        let store = LiveValueStore::new();
        let t0 = Instant::now();

        store.ingest(&rpm(), 100.0, t0);
        store.ingest(&rpm(), 120.0, t0 + Duration::from_millis(100));

        let v = store
            .interpolated_at(&rpm(), t0 + Duration::from_millis(150))
            .unwrap();
        assert!((v - 110.0).abs() < 1e-9);

        // Fully caught up after one interval, never beyond
        let v = store
            .interpolated_at(&rpm(), t0 + Duration::from_secs(5))
            .unwrap();
        assert_eq!(v, 120.0);
        assert_eq!(store.latest(&rpm()), Some(120.0));
    }

    #[test]
    fn test_single_sample_is_constant() {
        let store = LiveValueStore::new();
        let t0 = Instant::now();
        store.ingest(&rpm(), 42.0, t0);

        for ms in [0, 10, 1000] {
            assert_eq!(
                store.interpolated_at(&rpm(), t0 + Duration::from_millis(ms)),
                Some(42.0)
            );
        }
    }

    #[test]
    fn test_value_mode() {
        let store = LiveValueStore::new();
        let t0 = Instant::now();
        store.ingest(&rpm(), 0.0, t0);
        store.ingest(&rpm(), 10.0, t0 + Duration::from_millis(10));

        assert_eq!(store.value(&rpm(), ValueMode::Latest), Some(10.0));
        assert_eq!(ValueMode::from_interpolate(false), ValueMode::Latest);
        assert_eq!(ValueMode::default(), ValueMode::Interpolated);
    }

    #[test]
    fn test_non_finite_ignored() {
        let store = LiveValueStore::new();
        store.ingest(&rpm(), f64::NAN, Instant::now());
        assert!(store.is_empty());
    }
}
