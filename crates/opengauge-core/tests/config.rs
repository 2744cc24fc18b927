//! Loading configuration files

#[cfg(test)]
mod tests {
    use opengauge_core::config::{ClientConfig, ConfigError, ServerConfig};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_load_client_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"server": {"ipAddress": "192.168.1.20", "port": 4000}, "fps": 30, "interpolate": false}"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.server.ip_address, "192.168.1.20");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.fps, 30);
        assert!(!config.interpolate);
        // Untouched fields keep their defaults
        assert_eq!(config.reconnect_delay(), Duration::from_millis(2000));
        assert!(config.require_connection);
    }

    #[test]
    fn test_load_server_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.json");
        fs::write(&path, r#"{"rate": 50, "server": {"port": 5555}}"#).unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.source, "emulator");
        assert_eq!(config.server.ip_address, "0.0.0.0");
        assert_eq!(config.server.port, 5555);
        assert_eq!(config.send_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = ClientConfig::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ fps: sixty }").unwrap();

        assert!(matches!(
            ServerConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
