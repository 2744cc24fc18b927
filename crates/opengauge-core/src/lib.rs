//! # OpenGauge Core Library
//!
//! Core functionality for driving animated instrument gauges from live telemetry.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Flexible (percent or pixel) coordinate resolution with size-keyed caching
//! - The value transform engine (calibration curves, unit ranges, wrap, clamp)
//! - Arc-length sampling along vector paths
//! - A live value store with time-interpolated reads
//! - The line-delimited JSON streaming protocol (reconnecting client and server)
//! - Data sources: an emulated flight-instrument set and host CPU usage
//!
//! ## Example
//!
//! ```rust,ignore
//! use opengauge_core::prelude::*;
//!
//! let telemetry = Telemetry::new(&ClientConfig::default());
//! telemetry.connect("127.0.0.1", 1234);
//!
//! let mut events = telemetry.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let ClientEvent::Connected = event {
//!         telemetry.send_init(None, vars.clone(), vec![]).await?;
//!     }
//! }
//!
//! // Once per render tick
//! let degrees = telemetry.compute_transform(&needle_spec);
//! ```

pub mod config;
pub mod coordinate;
pub mod layer;
pub mod live;
pub mod path;
pub mod protocol;
pub mod server;
pub mod telemetry;
pub mod transform;
pub mod var;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ClientConfig, RenderOptions, ServerAddress, ServerConfig};
    pub use crate::coordinate::{FlexibleDimension, FlexibleValue, FlexibleVector2, Vector2Cache};
    pub use crate::layer::{FrameContext, Layer, LayerFrame, LayerTransforms};
    pub use crate::live::{LiveValueStore, ValueMode};
    pub use crate::path::{PathSampler, PathSpec, VectorPath};
    pub use crate::protocol::{
        ClientEvent, ConnectionState, InitPayload, ProtocolMessage, StreamClient, VarDef,
    };
    pub use crate::server::{CpuSource, DataSource, EmulatorSource, GaugeServer, ServerHandle};
    pub use crate::telemetry::Telemetry;
    pub use crate::transform::{compute, CalibrationPoint, TransformSpec};
    pub use crate::var::VarKey;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
