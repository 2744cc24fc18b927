//! OpenGauge Server
//!
//! Streams data source values to gauge clients and accepts operator
//! commands on stdin.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use opengauge_core::config::ServerConfig;
use opengauge_core::server::{create_source, ConsoleCommand, GaugeServer, ServerHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "opengauge-server", version)]
struct Cli {
    /// Server config JSON. Missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    ip: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Send interval in milliseconds.
    #[arg(long)]
    rate: Option<f64>,

    /// Data source name (emulator or cpu).
    #[arg(long)]
    source: Option<String>,

    /// Log extra diagnostics.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(ip) = &self.ip {
            config.server.ip_address = ip.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(rate) = self.rate {
            config.rate = rate;
        }
        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if self.debug {
            config.debug = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading server config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);

    let default_filter = if config.debug {
        "info,opengauge_core=debug,opengauge_server=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OpenGauge server {}", opengauge_core::VERSION);

    let source = create_source(&config.source)
        .with_context(|| format!("unknown data source '{}'", config.source))?;

    let server = GaugeServer::bind(
        (config.server.ip_address.as_str(), config.server.port),
        source,
        config.send_interval(),
    )
    .await
    .with_context(|| {
        format!(
            "binding {}:{}",
            config.server.ip_address, config.server.port
        )
    })?;

    let handle = server.handle();
    tokio::spawn(read_console(handle.clone()));

    let ctrl_c_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_handle.shutdown();
        }
    });

    tracing::info!("Press Ctrl+C to quit");
    server.run().await.context("server failed")?;

    Ok(())
}

/// Apply operator commands typed on stdin until shutdown or end of input
async fn read_console(handle: ServerHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while !handle.is_shutdown() {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Console read failed: {}", e);
                break;
            }
        };

        match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => {
                tracing::debug!("Console command {:?}", command);
                command.apply(&handle);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        std::fs::write(&path, r#"{"server": {"port": 5000}, "rate": 33.4}"#).unwrap();

        let cli = Cli::parse_from(["opengauge-server", "--port", "6000", "--debug"]);
        let mut config = ServerConfig::load(&path).unwrap();
        cli.apply(&mut config);

        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.ip_address, "0.0.0.0");
        assert_eq!(config.rate, 33.4);
        assert!(config.debug);
    }
}
