//! Lightstrand configuration file handling
//!
//! Loads and manages the ~/.config/lightstrand/config.yaml file with multi-bridge support.

use super::bridge_config::BridgeConfig;
use crate::multi::{AggregatorConfig, DEFAULT_MEMBER_TIMEOUT};
use crate::strand::SignalStates;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fan-out settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorSettings {
    /// Seconds a single bridge may take to answer; omit to wait forever
    #[serde(default = "default_member_timeout_secs")]
    pub member_timeout_secs: Option<u64>,
}

fn default_member_timeout_secs() -> Option<u64> {
    Some(DEFAULT_MEMBER_TIMEOUT.as_secs())
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            member_timeout_secs: default_member_timeout_secs(),
        }
    }
}

impl AggregatorSettings {
    pub fn to_aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            member_timeout: self.member_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Lightstrand configuration
///
/// Represents the complete ~/.config/lightstrand/config.yaml file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandConfig {
    /// Bridges in registration order
    pub bridges: Vec<BridgeConfig>,

    #[serde(default)]
    pub aggregator: AggregatorSettings,

    /// Light states used while mapping sockets
    #[serde(default)]
    pub signals: SignalStates,
}

impl StrandConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self {
            bridges: Vec::new(),
            aggregator: AggregatorSettings::default(),
            signals: SignalStates::default(),
        }
    }

    /// Load configuration from the default path (~/.config/lightstrand/config.yaml)
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        Self::load(&path)
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::StrandError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading Lightstrand configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            bridges = config.bridges.len(),
            member_timeout_secs = ?config.aggregator.member_timeout_secs,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save_default(&self) -> Result<()> {
        let path = Self::default_path();
        self.save(&path)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving Lightstrand configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/lightstrand/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("lightstrand");
        path.push("config.yaml");
        path
    }

    pub fn get_bridge(&self, name: &str) -> Option<&BridgeConfig> {
        self.bridges.iter().find(|b| b.name == name)
    }

    pub fn add_bridge(&mut self, bridge: BridgeConfig) {
        self.bridges.push(bridge);
    }

    pub fn remove_bridge(&mut self, name: &str) -> Option<BridgeConfig> {
        let index = self.bridges.iter().position(|b| b.name == name)?;
        Some(self.bridges.remove(index))
    }

    pub fn bridge_names(&self) -> Vec<&str> {
        self.bridges.iter().map(|b| b.name.as_str()).collect()
    }
}

impl Default for StrandConfig {
    fn default() -> Self {
        Self::new()
    }
}
