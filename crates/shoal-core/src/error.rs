//! Error types for schedules and registries.
//!
//! Both are configuration errors: they surface at construction time,
//! before any simulation step runs.

use std::error::Error;
use std::fmt;

/// Errors from constructing a [`Trigger`](crate::Trigger).
#[derive(Clone, Debug, PartialEq)]
pub enum ScheduleError {
    /// An iteration-interval trigger was given a period of zero.
    ZeroPeriod,
    /// A time-interval trigger was given a non-positive or non-finite interval.
    InvalidInterval {
        /// The rejected interval, in seconds.
        value: f64,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPeriod => write!(f, "iteration interval must be at least 1"),
            Self::InvalidInterval { value } => {
                write!(f, "time interval must be finite and positive, got {value}")
            }
        }
    }
}

impl Error for ScheduleError {}

/// Errors from positional or keyed access to a [`Registry`](crate::Registry).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A positional index was past the end of the collection.
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Current number of entries.
        len: usize,
    },
    /// `push_keyed` was called with a key that is already present.
    DuplicateKey {
        /// The conflicting key.
        key: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for registry of length {len}")
            }
            Self::DuplicateKey { key } => write!(f, "key '{key}' is already registered"),
        }
    }
}

impl Error for RegistryError {}
