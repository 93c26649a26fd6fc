//! Error types for model construction and stepping.

use std::error::Error;
use std::fmt;

use shoal_field::{FieldError, GridError};

/// Errors from building or advancing a [`Model`](crate::Model).
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// The grid is invalid.
    Grid(GridError),
    /// A field could not be built or looked up.
    Field(FieldError),
    /// A configuration invariant was violated.
    InvalidConfig {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// The requested step size is not finite and positive.
    InvalidTimeStep {
        /// The rejected step size.
        dt: f64,
    },
    /// A field required to rebuild the model is absent.
    MissingField {
        /// The absent field's accessor name.
        name: String,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Field(e) => write!(f, "field: {e}"),
            Self::InvalidConfig { reason } => write!(f, "invalid model config: {reason}"),
            Self::InvalidTimeStep { dt } => {
                write!(f, "time step must be finite and positive, got {dt}")
            }
            Self::MissingField { name } => write!(f, "missing field '{name}'"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            Self::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for ModelError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<FieldError> for ModelError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}
