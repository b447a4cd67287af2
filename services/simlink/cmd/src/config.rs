//! Configuration handling for the simlink client.
//!
//! This module reads configuration from a YAML file and environment
//! variables, providing a unified configuration interface.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::{info, warn};

/// Simlink client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimlinkConfig {
    /// Simulator address
    pub addr: SocketAddr,
    /// Client name announced in HELLO
    pub client_name: String,
    /// Client version announced in HELLO
    pub client_version: String,
    /// Protocol version announced in HELLO
    pub protocol_version: u16,
    /// Timeout for connect and handshake (seconds)
    pub timeout_secs: u64,
}

impl Default for SimlinkConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 1436)),
            client_name: "simlink".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: 2,
            timeout_secs: 10,
        }
    }
}

/// Root configuration structure (matches the YAML structure)
#[derive(Debug, Deserialize)]
struct RootConfig {
    simulator: Option<SimulatorSection>,
    client: Option<ClientSection>,
}

#[derive(Debug, Deserialize)]
struct SimulatorSection {
    address: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    name: Option<String>,
    version: Option<String>,
    protocol_version: Option<u16>,
}

impl SimlinkConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        // Try to read the config file
        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match serde_yaml::from_str::<RootConfig>(&content) {
                Ok(root_config) => {
                    config.apply_root_config(root_config);
                    info!("Loaded configuration from {:?}", config_path.as_ref());
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?} ({}), using defaults",
                        config_path.as_ref(),
                        e
                    );
                }
            }
        } else {
            warn!("Config file {:?} not found, using defaults", config_path.as_ref());
        }

        // Override with environment variables
        config.apply_overrides(|key| std::env::var(key).ok());

        info!(
            "Final simlink configuration: addr={}, client={} {}, protocol={}, timeout={}s",
            config.addr,
            config.client_name,
            config.client_version,
            config.protocol_version,
            config.timeout_secs
        );

        Ok(config)
    }

    /// Apply configuration from the root config structure
    fn apply_root_config(&mut self, root_config: RootConfig) {
        if let Some(simulator) = root_config.simulator {
            if let Some(address) = simulator.address {
                match address.parse::<SocketAddr>() {
                    Ok(addr) => self.addr = addr,
                    Err(_) => warn!("Ignoring invalid simulator address '{}'", address),
                }
            }
            if let Some(timeout) = simulator.timeout_secs {
                self.timeout_secs = timeout;
            }
        }

        if let Some(client) = root_config.client {
            if let Some(name) = client.name {
                self.client_name = name;
            }
            if let Some(version) = client.version {
                self.client_version = version;
            }
            if let Some(protocol_version) = client.protocol_version {
                self.protocol_version = protocol_version;
            }
        }
    }

    /// Apply variable overrides, looked up through `var`
    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = var("SIMLINK_ADDR") {
            if let Ok(addr) = addr.parse::<SocketAddr>() {
                self.addr = addr;
                info!("Simulator address overridden by environment: {}", addr);
            }
        }

        if let Some(name) = var("SIMLINK_CLIENT_NAME") {
            info!("Client name overridden by environment: {}", name);
            self.client_name = name;
        }

        if let Some(timeout) = var("SIMLINK_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.timeout_secs = secs;
                info!("Timeout overridden by environment: {}s", secs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SimlinkConfig::default();
        assert_eq!(config.addr, "127.0.0.1:1436".parse::<SocketAddr>().unwrap());
        assert_eq!(config.protocol_version, 2);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_load_from_file() {
        let yaml_content = r#"
simulator:
  address: 192.168.1.20:1436
  timeout_secs: 3

client:
  name: Fahrpult
  version: "2.0"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = SimlinkConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(config.addr, "192.168.1.20:1436".parse::<SocketAddr>().unwrap());
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.client_name, "Fahrpult");
        assert_eq!(config.client_version, "2.0");
        assert_eq!(config.protocol_version, 2);
    }

    #[test]
    fn test_missing_or_broken_file_uses_defaults() {
        let defaults = SimlinkConfig::default();

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"simulator: [unclosed").unwrap();
        let broken = SimlinkConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(broken.protocol_version, defaults.protocol_version);

        let missing = SimlinkConfig::load_from_file("/nonexistent/simlink.yaml").unwrap();
        assert_eq!(missing.protocol_version, defaults.protocol_version);
    }

    #[test]
    fn test_invalid_address_is_ignored() {
        let root: RootConfig = serde_yaml::from_str("simulator:\n  address: not-an-addr\n").unwrap();
        let mut config = SimlinkConfig::default();
        config.apply_root_config(root);
        assert_eq!(config.addr, SimlinkConfig::default().addr);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SIMLINK_ADDR", "10.0.0.5:1500"),
            ("SIMLINK_CLIENT_NAME", "override"),
            ("SIMLINK_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = SimlinkConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.addr, "10.0.0.5:1500".parse::<SocketAddr>().unwrap());
        assert_eq!(config.client_name, "override");
        assert_eq!(config.timeout_secs, 10);
    }
}
