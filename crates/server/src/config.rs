//! Server configuration.

use std::path::PathBuf;

/// Configuration for the Parley command server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Port the command endpoint binds on.
    pub port: u16,
    /// `host:port` of the fan-out relay the publisher connects to.
    pub relay_addr: String,
    /// Directory holding the snapshot file.
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            relay_addr: "127.0.0.1:5557".to_string(),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl ServerConfig {
    /// Build config from `PARLEY_PORT`, `PARLEY_RELAY_ADDR` and
    /// `PARLEY_DATA_DIR`, with defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PARLEY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            relay_addr: std::env::var("PARLEY_RELAY_ADDR").unwrap_or(defaults.relay_addr),
            data_dir: std::env::var("PARLEY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    /// Path of the single snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("server_data.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_ports() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.relay_addr, "127.0.0.1:5557");
        assert_eq!(config.snapshot_path(), PathBuf::from("data/server_data.json"));
    }
}
