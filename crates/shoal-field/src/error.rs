//! Error types for grid construction and field access.

use std::fmt;

use crate::grid::Axis;

/// Errors arising from grid construction.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// An axis was given zero interior cells.
    ZeroSize {
        /// The offending axis.
        axis: Axis,
    },
    /// An axis extent is non-positive or non-finite.
    InvalidExtent {
        /// The offending axis.
        axis: Axis,
        /// The rejected extent, in metres.
        value: f64,
    },
    /// An axis has no halo cells; stencils need at least one.
    ZeroHalo {
        /// The offending axis.
        axis: Axis,
    },
    /// Storage for one field, halos included, does not fit in `usize`.
    TooLarge {
        /// Interior cell counts.
        size: [usize; 3],
        /// Halo widths.
        halo: [usize; 3],
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize { axis } => write!(f, "grid has zero cells along {axis}"),
            Self::InvalidExtent { axis, value } => {
                write!(f, "extent along {axis} must be finite and positive, got {value}")
            }
            Self::ZeroHalo { axis } => write!(f, "halo along {axis} must be at least 1"),
            Self::TooLarge { size, halo } => {
                write!(f, "grid {size:?} with halo {halo:?} is too large to allocate")
            }
        }
    }
}

impl std::error::Error for GridError {}

/// Errors arising from field lookup or construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldError {
    /// No field is registered under this name.
    UnknownField {
        /// The requested name.
        name: String,
    },
    /// Supplied data does not match the field's storage shape.
    ShapeMismatch {
        /// Expected number of values (including halos).
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { name } => write!(f, "unknown field '{name}'"),
            Self::ShapeMismatch { expected, found } => {
                write!(f, "shape mismatch: expected {expected} values, found {found}")
            }
        }
    }
}

impl std::error::Error for FieldError {}
