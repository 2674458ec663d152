//! Lighting bridge wrapper for Rust
//!
//! A type-safe interface to the REST API of a lighting bridge, plus the
//! [`Controller`] capability every bridge-like backend implements.
//!
//! # Example
//!
//! ```no_run
//! use hue::{Bridge, Controller, LightState};
//!
//! # async fn run() -> hue::Result<()> {
//! let bridge = Bridge::new("192.168.1.20", "newdeveloper")?;
//!
//! // List lights
//! for light in bridge.get_lights().await? {
//!     println!("{} {}", light.id, light.name);
//! }
//!
//! // Turn light 3 red
//! let red = LightState::new().with_brightness(255).with_saturation(255).with_hue(65535);
//! bridge.set_light_state("3", &red).await?;
//! # Ok(())
//! # }
//! ```

mod bridge;
mod memory;

pub use bridge::Bridge;
pub use memory::{BridgeCall, MemoryBridge};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Timestamp format the bridge uses for `lastscan`
const LAST_SCAN_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Errors that can occur when talking to a bridge
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bridge error {kind} at {address}: {description}")]
    Api {
        kind: u16,
        address: String,
        description: String,
    },

    #[error("Light not found: {0}")]
    LightNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Bridge unavailable: {0}")]
    Unavailable(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Identifier a bridge assigns to a light
///
/// Only unique within one bridge, and may change when the bridge is reset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LightId(String);

impl LightId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LightId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for LightId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Sparse light state
///
/// Every field is optional. When sent to a bridge only the present fields
/// are changed; when read from a bridge absent fields were not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    /// Brightness (0-255)
    #[serde(default, rename = "bri", skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// Hue (0-65535)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    /// Saturation (0-255)
    #[serde(default, rename = "sat", skip_serializing_if = "Option::is_none")]
    pub saturation: Option<u8>,
    /// Color temperature in mireds
    #[serde(default, rename = "ct", skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,
    /// Transition time in multiples of 100ms
    #[serde(
        default,
        rename = "transitiontime",
        skip_serializing_if = "Option::is_none"
    )]
    pub transition_time: Option<u16>,
}

impl LightState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_hue(mut self, hue: u16) -> Self {
        self.hue = Some(hue);
        self
    }

    pub fn with_saturation(mut self, saturation: u8) -> Self {
        self.saturation = Some(saturation);
        self
    }

    pub fn with_color_temp(mut self, mireds: u16) -> Self {
        self.color_temp = Some(mireds);
        self
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay the fields present in `other` onto this state
    pub fn apply(&mut self, other: &LightState) {
        if other.on.is_some() {
            self.on = other.on;
        }
        if other.brightness.is_some() {
            self.brightness = other.brightness;
        }
        if other.hue.is_some() {
            self.hue = other.hue;
        }
        if other.saturation.is_some() {
            self.saturation = other.saturation;
        }
        if other.color_temp.is_some() {
            self.color_temp = other.color_temp;
        }
        if other.transition_time.is_some() {
            self.transition_time = other.transition_time;
        }
    }
}

/// A light as reported by a bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Light {
    pub id: LightId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LightState>,
}

impl Light {
    pub fn new(id: impl Into<LightId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: None,
        }
    }
}

/// Full attributes of a single light
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightAttributes {
    #[serde(default)]
    pub state: LightState,
    #[serde(default, rename = "type")]
    pub light_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "modelid")]
    pub model_id: String,
    #[serde(default, rename = "swversion")]
    pub sw_version: String,
}

/// When the bridge last searched for new lights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastScan {
    /// No search has run since the bridge started
    Never,
    /// A search is running right now
    Active,
    /// The last search finished at this (bridge local) time
    At(NaiveDateTime),
}

impl LastScan {
    /// Parse the `lastscan` value of a bridge response
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "none" => Ok(LastScan::Never),
            "active" => Ok(LastScan::Active),
            other => NaiveDateTime::parse_from_str(other, LAST_SCAN_FORMAT)
                .map(LastScan::At)
                .map_err(|e| Error::InvalidResponse(format!("lastscan '{}': {}", other, e))),
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            LastScan::At(at) => Some(*at),
            _ => None,
        }
    }
}

impl fmt::Display for LastScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastScan::Never => write!(f, "none"),
            LastScan::Active => write!(f, "active"),
            LastScan::At(at) => write!(f, "{}", at.format(LAST_SCAN_FORMAT)),
        }
    }
}

/// Result of a new-light query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLights {
    pub lights: Vec<Light>,
    pub last_scan: LastScan,
}

/// Control surface of one lighting bridge
///
/// Light ids are passed as plain strings so that wrappers can expose a
/// different id space (for example physical socket positions) through the
/// same trait.
#[async_trait]
pub trait Controller: Send + Sync {
    /// All lights known to the bridge
    async fn get_lights(&self) -> Result<Vec<Light>>;

    /// Lights found by the most recent search, with the scan time
    async fn get_new_lights(&self) -> Result<NewLights>;

    /// Start a search for new lights
    async fn search_for_new_lights(&self) -> Result<()>;

    async fn get_light_attributes(&self, light_id: &str) -> Result<LightAttributes>;

    async fn set_light_name(&self, light_id: &str, name: &str) -> Result<()>;

    async fn set_light_state(&self, light_id: &str, state: &LightState) -> Result<()>;
}
