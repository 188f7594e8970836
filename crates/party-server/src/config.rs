//! Server configuration

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Server configuration, loaded from YAML
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server
    pub bind_address: SocketAddr,
    /// Maximum connected clients
    pub max_clients: usize,
    /// Server ticks per second
    pub tick_rate_hz: u32,
    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
    /// Party rules
    pub party: PartyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 7777)),
            max_clients: 64,
            tick_rate_hz: 60,
            log_filter: "party_server=info".to_string(),
            party: PartyConfig::default(),
        }
    }
}

/// Party configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyConfig {
    /// Maximum members per party
    pub max_size: usize,
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self { max_size: 10 }
    }
}

impl ServerConfig {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// A party is created with two members, so anything smaller can never hold.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.party.max_size >= 2,
            "party.max_size must be at least 2, got {}",
            self.party.max_size
        );
        Ok(())
    }

    /// Load from `path` if it exists, otherwise defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Tick duration derived from the tick rate (clamped to at least 1 Hz)
    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}
