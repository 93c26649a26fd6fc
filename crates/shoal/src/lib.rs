//! Shoal: scheduled diagnostics, segmented output and checkpoint/restart
//! for grid fluid models.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Shoal sub-crates. For most users, adding `shoal` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use shoal::prelude::*;
//!
//! let grid = RegularGrid::new([8, 8, 4], [1.0, 1.0, 1.0], [1, 1, 1]).unwrap();
//! let mut model = Model::new(ModelConfig::new(grid)).unwrap();
//! model.set("T", |_, _, z| 20.0 + z).unwrap();
//!
//! let mut sim = Simulation::new(model, SimulationConfig::iterations(0.01, 10)).unwrap();
//! sim.diagnostics_mut()
//!     .push_keyed(
//!         "T_profile",
//!         HorizontalAverage::new(["T"], Trigger::iterations(5).unwrap()).unwrap(),
//!     )
//!     .unwrap();
//! sim.run().unwrap();
//!
//! assert_eq!(sim.clock().iteration, 10);
//! let profile = sim.diagnostics().get_by_key("T_profile").unwrap().output();
//! assert!(matches!(profile, DiagnosticOutput::Profile(p) if p.len() == 6));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `shoal-core` | Clock, triggers, keyed registry |
//! | [`field`] | `shoal-field` | Grids, halo'd fields, reduction backends, field accessor |
//! | [`model`] | `shoal-model` | Reference model and time stepping |
//! | [`diagnostics`] | `shoal-diagnostics` | Diagnostics runner and built-in diagnostics |
//! | [`output`] | `shoal-output` | Archive codec, segmented writer, checkpointer |
//! | [`engine`] | `shoal-engine` | Simulation driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Clock, triggers, and the keyed registry (`shoal-core`).
pub use shoal_core as types;

/// Grid geometry, fields, reduction backends, and the read-only field
/// accessor traits (`shoal-field`).
///
/// Callbacks read state through [`field::StateView`].
pub use shoal_field as field;

/// The reference model (`shoal-model`).
pub use shoal_model as model;

/// Diagnostics runner and built-in diagnostics (`shoal-diagnostics`).
pub use shoal_diagnostics as diagnostics;

/// Archives, segmented output, checkpoints and trajectory comparison
/// (`shoal-output`).
///
/// Read written parts back with [`output::OutputReader`]; restore a model
/// with [`output::Checkpointer::restore`].
pub use shoal_output as output;

/// The simulation driver (`shoal-engine`).
pub use shoal_engine as engine;

/// Common imports for typical Shoal usage.
///
/// ```rust
/// use shoal::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use shoal_core::{Clock, Registry, Trigger};

    // Fields
    pub use shoal_field::{Backend, Closure, Field, FieldAccess, RegularGrid, StateView};

    // Model
    pub use shoal_model::{Model, ModelConfig, StepMode};

    // Diagnostics
    pub use shoal_diagnostics::{
        AdvectiveCfl, Diagnostic, DiagnosticOutput, Diagnostics, DiffusiveCfl, FieldMaximum,
        HorizontalAverage, NaNChecker, Timeseries, VelocityDivergenceChecker,
    };

    // Output
    pub use shoal_output::{
        compare_states, Checkpointer, OutputReader, OutputWriter, Section, SegmentedWriter,
    };

    // Errors
    pub use shoal_diagnostics::DiagnosticError;
    pub use shoal_model::ModelError;
    pub use shoal_output::{CheckpointError, OutputError};

    // Engine
    pub use shoal_engine::{Simulation, SimulationConfig, StepError, StepMetrics};
}
