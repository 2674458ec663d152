//! Lightstrand - socket-addressed lights over one or more lighting bridges
//!
//! A bridge numbers its lights however it likes, renumbers them after a
//! reset, and knows nothing about other bridges. Lightstrand lets clients
//! address lights by physical socket position instead.
//!
//! # Architecture
//!
//! - **strand**: Socket ⇄ light identity map and the interactive mapping session
//! - **multi**: Fan-out aggregator presenting several bridges as one
//! - **config**: Bridge list, timeouts and signal colors
//! - **logging**: tracing subscriber setup
//!
//! Talking to an actual bridge lives in the `hue` crate.

pub mod config;
pub mod error;
pub mod logging;
pub mod multi;
pub mod strand;

// Re-exports
pub use error::{Result, StrandError};
pub use multi::{Aggregate, AggregateError, Member, MultiController};
pub use strand::{IdentityMap, LightStrand, SocketId};
