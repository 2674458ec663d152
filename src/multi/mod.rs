//! Multi-bridge aggregation
//!
//! Presents several independent bridges as one. Every fan-out call runs one
//! task per bridge, waits for all of them (bounded by a per-bridge timeout)
//! and merges the replies in registration order. Bridges that fail or time
//! out are reported next to the merged value instead of being dropped.

mod aggregate;
mod aggregator;

pub use aggregate::{Aggregate, AggregateError, FailureKind, MemberFailure};
pub use aggregator::{AggregatorConfig, Member, MultiController, DEFAULT_MEMBER_TIMEOUT};
