//! Scheduled diagnostics for Shoal simulations.
//!
//! A [`Diagnostic`] computes a derived quantity from a read-only
//! [`StateView`](shoal_field::StateView) and never mutates it. The
//! [`Diagnostics`] runner holds them in registration order and runs
//! those whose [`Trigger`](shoal_core::Trigger) fires after each step.
//!
//! Two kinds can end a run: [`NaNChecker`] on any non-finite value and
//! [`VelocityDivergenceChecker`] above its abort threshold. Their
//! errors satisfy [`DiagnosticError::is_fatal`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod average;
pub mod checks;
pub mod diagnostic;
pub mod error;
pub mod reductions;
pub mod runner;
pub mod timeseries;

pub use average::HorizontalAverage;
pub use checks::{divergence, DivergenceStats, NaNChecker, VelocityDivergenceChecker};
pub use diagnostic::{Diagnostic, DiagnosticOutput};
pub use error::DiagnosticError;
pub use reductions::{
    advective_cfl, diffusive_cfl, field_maximum, AdvectiveCfl, DiffusiveCfl, FieldMaximum,
};
pub use runner::Diagnostics;
pub use timeseries::{Probe, Timeseries, SINGLE_PROBE};
