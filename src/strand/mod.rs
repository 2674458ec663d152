//! Light strands
//!
//! A strand is a fixed number of physical sockets wired to one bridge. The
//! bridge numbers its lights however it likes (and renumbers them after a
//! reset), so each strand keeps an [`IdentityMap`] from socket position to
//! bridge light id and exposes the bridge in socket-id space.
//!
//! The map is filled by a [`MappingSession`], which lights up one unmapped
//! bulb at a time and asks a [`SocketOracle`] where it is.
//!
//! # Example
//!
//! ```no_run
//! use hue::MemoryBridge;
//! use lightstrand::strand::LightStrand;
//! use std::sync::Arc;
//!
//! # async fn run() -> lightstrand::Result<()> {
//! let strand = LightStrand::new(12, Arc::new(MemoryBridge::with_lights(["1", "2"])));
//! let mut next = 0;
//! strand
//!     .map_unmapped_lights(move || {
//!         next += 1;
//!         next.to_string()
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod identity_map;
mod light_strand;
mod mapping;
mod socket;

pub use identity_map::{Displaced, IdentityMap};
pub use light_strand::LightStrand;
pub use mapping::{
    MappedLight, MappingReport, MappingSession, MappingState, SignalStates, SocketOracle,
};
pub use socket::{valid_socket_id, SocketId, ValidationError};
