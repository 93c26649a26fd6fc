//! Reference fluid model for the Shoal callback layer.
//!
//! The callback layer treats the model as an external collaborator and
//! reads it only through [`StateView`](shoal_field::StateView). This
//! crate supplies a small but complete one so that checkpoints can be
//! restored into a live model and trajectories compared:
//!
//! - prognostic velocities `u`, `v`, `w` on a C-grid (faces) and
//!   cell-centred tracers (default `T` and `S`);
//! - velocities diffuse with viscosity `ν` and rotate with Coriolis `f`;
//!   tracers are advected by the velocity and diffuse with `κ`;
//! - time stepping is second-order Adams–Bashforth with a Forward-Euler
//!   startup step, so every prognostic field carries a tendency history.
//!
//! There is no pressure solve and no boundary-condition physics beyond
//! periodic horizontal halos and no-flux vertical halos.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod model;
pub mod names;
pub mod tendencies;

pub use config::ModelConfig;
pub use error::ModelError;
pub use model::{Model, StepMode};
pub use names::{previous_tendency_name, tendency_name, VELOCITIES};
