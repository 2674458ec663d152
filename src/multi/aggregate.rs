//! Results of fan-out calls

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why one bridge did not contribute to an aggregate result
#[derive(Debug)]
pub enum FailureKind {
    /// The bridge returned an error
    Controller(hue::Error),
    /// The bridge did not answer within the member timeout
    TimedOut(Duration),
    /// The task running the call panicked or was cancelled
    Panicked(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Controller(e) => write!(f, "{}", e),
            FailureKind::TimedOut(limit) => {
                write!(f, "timed out after {:.1}s", limit.as_secs_f64())
            }
            FailureKind::Panicked(msg) => write!(f, "task failed: {}", msg),
        }
    }
}

/// A failure attributed to one registered bridge
#[derive(Debug)]
pub struct MemberFailure {
    /// Registration index of the bridge
    pub index: usize,
    pub member: String,
    pub kind: FailureKind,
}

impl MemberFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, FailureKind::TimedOut(_))
    }
}

impl fmt::Display for MemberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.member, self.kind)
    }
}

fn join_failures(failures: &[MemberFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every bridge failure of one fan-out call, in registration order
#[derive(Error, Debug)]
#[error("{count} bridge(s) failed: {summary}", count = .failures.len(), summary = join_failures(.failures))]
pub struct AggregateError {
    pub failures: Vec<MemberFailure>,
}

/// Merged value of a fan-out call plus the bridges that did not contribute
///
/// A result with failures is partial: `value` holds only what the
/// successful bridges returned.
#[derive(Debug)]
pub struct Aggregate<T> {
    pub value: T,
    pub failures: Vec<MemberFailure>,
}

impl<T> Aggregate<T> {
    /// Every bridge answered successfully
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// At least one bridge hit the member timeout
    pub fn timed_out(&self) -> bool {
        self.failures.iter().any(MemberFailure::is_timeout)
    }

    pub fn first_failure(&self) -> Option<&MemberFailure> {
        self.failures.first()
    }

    /// The merged value, or every failure if any bridge failed
    pub fn into_result(self) -> Result<T, AggregateError> {
        if self.failures.is_empty() {
            Ok(self.value)
        } else {
            Err(AggregateError {
                failures: self.failures,
            })
        }
    }
}
