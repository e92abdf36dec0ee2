//! Configuration management for Beaconnet.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub keys: KeysConfig,
    pub mesh: MeshConfig,
    pub radio: RadioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Directory holding `id_rsa` / `id_rsa.pub`.
    pub path: String,
    /// RSA modulus size used when generating a new identity.
    pub bits: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Directory holding one JSON record per encountered peer.
    pub peers_path: String,
    /// Self-advertisement period in milliseconds.
    pub advertise_period_ms: u64,
    /// Seconds of silence after which a live peer is considered lost.
    pub peer_ttl_secs: u64,
    /// Frame dispatch worker count, 0 for one per CPU.
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Monitor-capable wireless interface name.
    pub interface: String,
    /// Channels to hop on; empty means every supported channel.
    pub channels: Vec<u32>,
    /// Channel hopping period in milliseconds.
    pub hop_period_ms: u64,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            keys: KeysConfig {
                path: "/etc/beaconnet".to_string(),
                bits: 4096,
            },
            mesh: MeshConfig {
                peers_path: "/var/lib/beaconnet/peers".to_string(),
                advertise_period_ms: 300,
                peer_ttl_secs: 1800,
                workers: 0,
            },
            radio: RadioConfig {
                interface: "wlan0mon".to_string(),
                channels: Vec::new(),
                hop_period_ms: 250,
            },
        }
    }
}
