//! Socket ids: stable physical positions in a strand

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a socket id string was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{0}' is not a number")]
    NotNumeric(String),

    #[error("{value} is outside 1..={length}")]
    OutOfRange { value: i64, length: u32 },
}

/// Position of a light in a strand, counted from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(u32);

impl SocketId {
    /// Parse a decimal socket id and check it lies in `1..=length`
    pub fn parse(value: &str, length: u32) -> Result<Self, ValidationError> {
        let number: i64 = value
            .parse()
            .map_err(|_| ValidationError::NotNumeric(value.to_string()))?;

        if number < 1 || number > i64::from(length) {
            return Err(ValidationError::OutOfRange { value: number, length });
        }

        // in range of u32 after the bounds check above
        Ok(Self(number as u32))
    }

    /// Build a socket id without a range check
    ///
    /// Returns `None` for 0, which is never a valid position.
    pub fn new(position: u32) -> Option<Self> {
        (position > 0).then_some(Self(position))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True if `value` names a socket of a strand with `length` sockets
pub fn valid_socket_id(value: &str, length: u32) -> bool {
    SocketId::parse(value, length).is_ok()
}
