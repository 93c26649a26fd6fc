//! Grid geometry, field storage, and the Field Accessor for Shoal.
//!
//! Diagnostics and writers never see the model directly. They read
//! through [`StateView`], which exposes the clock, the [`RegularGrid`],
//! named [`Field`]s (including halo storage), and the [`Backend`] that
//! decides how reductions over cells are executed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod access;
pub mod backend;
pub mod error;
pub mod field;
pub mod grid;

pub use access::{Closure, FieldAccess, StateView};
pub use backend::{Backend, Reduction};
pub use error::{FieldError, GridError};
pub use field::Field;
pub use grid::{Axis, RegularGrid};
