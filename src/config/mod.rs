//! Configuration system
//!
//! Loads ~/.config/lightstrand/config.yaml with support for:
//! - Multiple bridges, each driving one strand of sockets
//! - Per-bridge timeouts for fan-out calls
//! - Custom signal colors for interactive mapping

mod bridge_config;
mod strand_config;
pub mod validation;

pub use bridge_config::BridgeConfig;
pub use strand_config::{AggregatorSettings, StrandConfig};
pub use validation::{validate_config, validate_config_result, ConfigIssue};
