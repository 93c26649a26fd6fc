//! Reusable grids, mock states and models.
//!
//! - [`small_grid`]: 8×8×4 cells on a unit cube, one halo cell.
//! - [`velocity_state`]: `u`, `v`, `w` with a uniform `u`.
//! - [`linear_tracer_state`]: tracer `T = a + b·z`.
//! - [`spun_up_model`]: reference model with nonzero tendency history.

use shoal_field::RegularGrid;
use shoal_model::{Model, ModelConfig};

use crate::MockState;

/// An 8×8×4 grid on `[0, 1] × [0, 1] × [-1, 0]` with unit halos.
pub fn small_grid() -> RegularGrid {
    grid([8, 8, 4], [1.0, 1.0, 1.0])
}

/// A grid with unit halos and the given size and extent.
///
/// # Panics
///
/// Panics if the grid parameters are invalid.
pub fn grid(size: [usize; 3], extent: [f64; 3]) -> RegularGrid {
    RegularGrid::new(size, extent, [1, 1, 1]).expect("fixture grid must be valid")
}

/// Velocities `u = u0`, `v = w = 0` on [`small_grid`].
pub fn velocity_state(u0: f64) -> MockState {
    let mut state = MockState::new(small_grid())
        .with_field("u")
        .with_field("v")
        .with_field("w");
    state.set_with("u", |_, _, _| u0);
    state
}

/// Tracer `T = a + b·z` on [`small_grid`].
pub fn linear_tracer_state(a: f64, b: f64) -> MockState {
    let mut state = MockState::new(small_grid()).with_tracer("T");
    state.set_with("T", |_, _, z| a + b * z);
    state
}

/// The reference model configuration used across tests: [`small_grid`],
/// small viscosity and diffusivity, and rotation.
pub fn model_config() -> ModelConfig {
    let mut config = ModelConfig::new(small_grid());
    config.closure.viscosity = 1e-3;
    config.closure.diffusivity = 5e-4;
    config.coriolis = 1e-1;
    config
}

/// A model built from [`model_config`] with seeded random velocities and
/// tracers, advanced `steps` times with `dt`.
///
/// # Panics
///
/// Panics if the model cannot be built or stepped.
pub fn spun_up_model(steps: u64, dt: f64) -> Model {
    let mut model = Model::new(model_config()).expect("fixture model config must be valid");
    model
        .set("T", |_, _, z| 20.0 + 2.0 * z)
        .expect("fixture fields exist");
    for (seed, name) in ["u", "v", "w", "T", "S"].into_iter().enumerate() {
        model
            .randomize(name, 0.1, seed as u64 + 1)
            .expect("fixture fields exist");
    }
    for _ in 0..steps {
        model
            .step(dt, shoal_model::StepMode::Auto)
            .expect("fixture step must succeed");
    }
    model
}
