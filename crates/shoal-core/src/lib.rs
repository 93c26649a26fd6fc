//! Core types for the Shoal scheduled-callback layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the simulation [`Clock`], the [`Trigger`] schedules that decide when a
//! writer or diagnostic runs, and the [`Registry`] ordered collection
//! used to hold callbacks by position and by symbolic key.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod registry;
pub mod schedule;

pub use clock::Clock;
pub use error::{RegistryError, ScheduleError};
pub use registry::Registry;
pub use schedule::{should_fire, Trigger};
