//! Configuration
//!
//! Client and server settings loaded from JSON files. Every field has a
//! default so a partial (or empty) file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default TCP port shared by client and server
pub const DEFAULT_PORT: u16 = 1234;

/// Default delay between reconnect attempts in milliseconds
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Address of a telemetry server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerAddress {
    /// IP address or host name
    pub ip_address: String,
    /// TCP port
    pub port: u16,
}

impl ServerAddress {
    fn client_default() -> Self {
        Self {
            ip_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }

    fn listen_default() -> Self {
        Self {
            ip_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::client_default()
    }
}

/// Settings of the gauge client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Server to connect to
    pub server: ServerAddress,
    /// Intended render rate
    pub fps: u32,
    /// Log extra diagnostics
    pub debug: bool,
    /// Smooth values between samples (otherwise the newest raw sample is used)
    pub interpolate: bool,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay_ms: u64,
    /// Only render panels while connected
    pub require_connection: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerAddress::client_default(),
            fps: 60,
            debug: false,
            interpolate: true,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            require_connection: true,
        }
    }
}

impl ClientConfig {
    /// Load a client config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path.as_ref())
    }

    /// Reconnect delay as a duration
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Duration of one render tick
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }

    /// Options handed to the per-frame math
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            use_cache: true,
            debug: self.debug,
        }
    }
}

/// Settings of the telemetry server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Which data source to use
    pub source: String,
    /// Address to listen on
    #[serde(deserialize_with = "listen_address")]
    pub server: ServerAddress,
    /// Poll rate of the data source in milliseconds (also the network send rate)
    pub rate: f64,
    /// Log extra diagnostics
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            source: "emulator".to_string(),
            server: ServerAddress::listen_default(),
            rate: 16.7,
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Load a server config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path.as_ref())
    }

    /// Send interval, never shorter than one millisecond
    pub fn send_interval(&self) -> Duration {
        let ms = if self.rate.is_finite() { self.rate } else { 16.7 };
        Duration::from_secs_f64(ms.max(1.0) / 1000.0)
    }
}

/// A partial `server` object in a server config falls back to the listen
/// defaults rather than the client ones
fn listen_address<'de, D>(deserializer: D) -> Result<ServerAddress, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Partial {
        ip_address: Option<String>,
        port: Option<u16>,
    }

    let partial = Partial::deserialize(deserializer)?;
    let defaults = ServerAddress::listen_default();
    Ok(ServerAddress {
        ip_address: partial.ip_address.unwrap_or(defaults.ip_address),
        port: partial.port.unwrap_or(defaults.port),
    })
}

/// Small immutable options struct passed into the per-frame functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Reuse resolved coordinates while the container size is unchanged
    pub use_cache: bool,
    /// Emit per-transform debug logs
    pub debug: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            debug: false,
        }
    }
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}
