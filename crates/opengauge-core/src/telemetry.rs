//! Telemetry façade
//!
//! The consumer-facing entry point: owns the live value store, the stream
//! client and the path measurement cache, and exposes the per-frame helpers
//! a renderer calls.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::{ClientConfig, RenderOptions};
use crate::coordinate::{FlexibleVector2, Vector2Cache};
use crate::live::{LiveValueStore, ValueMode};
use crate::path::{PathSampler, PathSpec, VectorPath};
use crate::protocol::{ClientEvent, InitPayload, ProtocolError, ProtocolMessage, StreamClient, VarDef};
use crate::transform::{compute_with, TransformSpec};
use crate::var::VarKey;

/// Live telemetry for a gauge client
pub struct Telemetry {
    store: Arc<LiveValueStore>,
    client: StreamClient,
    sampler: Mutex<PathSampler>,
    mode: ValueMode,
    options: RenderOptions,
}

impl Telemetry {
    /// Create from client settings. Nothing connects until
    /// [`connect`](Self::connect).
    pub fn new(config: &ClientConfig) -> Self {
        let store = Arc::new(LiveValueStore::new());
        let client = StreamClient::new(Some(Arc::clone(&store)), config.reconnect_delay());

        Self {
            store,
            client,
            sampler: Mutex::new(PathSampler::new()),
            mode: ValueMode::from_interpolate(config.interpolate),
            options: config.render_options(),
        }
    }

    /// Start connecting in the background; does nothing if already running
    pub fn connect(&self, host: impl Into<String>, port: u16) {
        self.client.connect(host, port);
    }

    /// Stop the connection
    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }

    /// Lifecycle and message events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.client.subscribe()
    }

    /// The underlying stream client
    pub fn client(&self) -> &StreamClient {
        &self.client
    }

    /// The shared value store
    pub fn store(&self) -> &Arc<LiveValueStore> {
        &self.store
    }

    /// Render options in effect
    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Tell the server which vehicle the gauges are for and what to send.
    ///
    /// Call after every [`ClientEvent::Connected`]. A no-op while
    /// disconnected.
    pub async fn send_init(
        &self,
        vehicle_name: Option<String>,
        vars: Vec<VarDef>,
        events: Vec<String>,
    ) -> Result<(), ProtocolError> {
        tracing::info!("Sending init with {} vars", vars.len());
        self.client
            .send(&ProtocolMessage::Init(InitPayload {
                vehicle_name,
                vars,
                events,
            }))
            .await
    }

    /// Current value of a var per the configured [`ValueMode`]
    pub fn get_value(&self, name: &str, unit: &str) -> Option<f64> {
        self.value(&VarKey::new(name, unit))
    }

    /// Current value of a var per the configured [`ValueMode`]
    pub fn value(&self, key: &VarKey) -> Option<f64> {
        match self.mode {
            ValueMode::Interpolated => self.store.interpolated_at(key, Instant::now()),
            ValueMode::Latest => self.store.latest(key),
        }
    }

    /// Resolve a flexible coordinate against a container
    pub fn resolve_coordinate(
        &self,
        raw: &FlexibleVector2,
        cache: &mut Vector2Cache,
        width: f64,
        height: f64,
    ) -> (f64, f64) {
        cache.resolve(raw, width, height, self.options.use_cache)
    }

    /// Map the current value of a transform's var
    pub fn compute_transform(&self, spec: &TransformSpec) -> f64 {
        self.compute_transform_with(spec, self.value(spec.var()))
    }

    /// Map an explicit sample
    pub fn compute_transform_with(&self, spec: &TransformSpec, sample: Option<f64>) -> f64 {
        compute_with(spec, sample, &self.options)
    }

    /// Offset along a path for a normalized value in `[-1, 1]`
    pub fn sample_path(
        &self,
        path: &VectorPath,
        spec: &PathSpec,
        container_width: f64,
        container_height: f64,
        normalized: f64,
    ) -> (f64, f64) {
        match self.sampler.lock() {
            Ok(mut sampler) => {
                sampler.sample(path, spec, container_width, container_height, normalized)
            }
            Err(_) => (0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_mode() {
        let config = ClientConfig {
            interpolate: false,
            ..Default::default()
        };
        let telemetry = Telemetry::new(&config);
        let key = VarKey::new("INDICATED ALTITUDE", "feet");

        let t0 = Instant::now();
        telemetry.store().ingest(&key, 1000.0, t0);
        telemetry.store().ingest(&key, 2000.0, t0);

        assert_eq!(telemetry.get_value("INDICATED ALTITUDE", "feet"), Some(2000.0));
        assert_eq!(telemetry.get_value("INDICATED ALTITUDE", "meters"), None);
    }

    #[test]
    fn test_compute_missing_var_is_zero() {
        let telemetry = Telemetry::new(&ClientConfig::default());
        let spec = TransformSpec::new(VarKey::new("AIRSPEED INDICATED", "knots"))
            .unwrap()
            .with_output_range(0.0, 300.0)
            .unwrap();
        assert_eq!(telemetry.compute_transform(&spec), 0.0);
    }
}
