//! Simulation driver for Shoal.
//!
//! Provides [`Simulation`], which steps a [`Model`](shoal_model::Model)
//! and runs its diagnostics and output writers after every step, and the
//! lower-level [`step`] function for callers that manage their own loop.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod simulation;
pub mod step;

pub use config::{ConfigError, SimulationConfig, STOP_TIME_SLACK};
pub use metrics::StepMetrics;
pub use simulation::Simulation;
pub use step::{run_callbacks, step, Outputs, StepError};
