//! Error types for Lightstrand
//!
//! Bridge failures arrive as `hue::Error` and are wrapped here alongside
//! mapping, routing and configuration failures.

use crate::multi::AggregateError;
use crate::strand::ValidationError;
use thiserror::Error;

/// Result type alias for Lightstrand operations
pub type Result<T> = std::result::Result<T, StrandError>;

/// Comprehensive error type for Lightstrand operations
#[derive(Error, Debug)]
pub enum StrandError {
    /// A bridge call failed
    #[error("Controller error: {0}")]
    Controller(#[from] hue::Error),

    /// One or more bridges failed during a fan-out call
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// A socket id supplied during mapping was rejected
    #[error("Invalid socket id: {0}")]
    Validation(#[from] ValidationError),

    /// No registered bridge owns this socket
    #[error("Unknown socket: {0}")]
    UnknownSocket(String),

    /// A bridge did not answer within the configured timeout
    #[error("Bridge '{member}' timed out after {seconds:.1}s")]
    TimedOut { member: String, seconds: f64 },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Anyhow errors (for more context)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl StrandError {
    /// True when the failure came from a bridge rather than from local input
    pub fn is_controller_failure(&self) -> bool {
        matches!(
            self,
            StrandError::Controller(_) | StrandError::Aggregate(_) | StrandError::TimedOut { .. }
        )
    }
}
