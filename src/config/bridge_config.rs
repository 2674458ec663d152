//! Bridge configuration
//!
//! One entry per lighting bridge, with the strand wired to it.

use crate::{Result, StrandError};
use serde::{Deserialize, Serialize};

/// A bridge and the strand of sockets behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Name used in logs and on the command line
    pub name: String,

    /// Host or base URL of the bridge
    pub address: String,

    /// Authorized bridge username, or `$VAR` to read it from the environment
    pub username: String,

    /// Number of sockets in the strand
    pub sockets: u32,
}

impl BridgeConfig {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        username: impl Into<String>,
        sockets: u32,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            username: username.into(),
            sockets,
        }
    }

    /// The username with `$VAR` references expanded
    pub fn resolved_username(&self) -> Result<String> {
        match self.username.strip_prefix('$') {
            Some(var) => std::env::var(var).map_err(|_| {
                StrandError::Config(format!(
                    "Bridge '{}': environment variable {} is not set",
                    self.name, var
                ))
            }),
            None => Ok(self.username.clone()),
        }
    }

    /// HTTP client for this bridge
    pub fn connect(&self) -> Result<hue::Bridge> {
        let username = self.resolved_username()?;
        tracing::debug!(bridge = %self.name, address = %self.address, "Connecting to bridge");
        Ok(hue::Bridge::new(&self.address, &username)?)
    }
}
