//! Benchmark profiles for the Shoal scheduled-callback layer.
//!
//! Provides pre-built [`ModelConfig`] profiles for benchmarking:
//!
//! - [`reference_profile`]: 64x64x16 grid (~65K cells)
//! - [`stress_profile`]: 128x128x32 grid (~520K cells)
//! - [`seeded_model`]: a model with deterministic random initial state

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use shoal_field::{Backend, Closure, GridError, RegularGrid};
use shoal_model::{Model, ModelConfig, ModelError};

/// Time step used by the benchmark profiles, in seconds. Well inside the
/// advective limit for velocities of order 0.1 m/s on these grids.
pub const DT: f64 = 10.0;

fn profile(size: [usize; 3], backend: Backend) -> Result<ModelConfig, GridError> {
    let grid = RegularGrid::new(size, [10_000.0, 10_000.0, 500.0], [1, 1, 1])?;
    let mut config = ModelConfig::new(grid);
    config.closure = Closure {
        viscosity: 1e-2,
        diffusivity: 1e-3,
    };
    config.coriolis = 1e-4;
    config.backend = backend;
    Ok(config)
}

/// Build the reference profile: 64x64x16 cells over a 10 km x 10 km x
/// 500 m box, rotating, with weak diffusion.
pub fn reference_profile(backend: Backend) -> Result<ModelConfig, GridError> {
    profile([64, 64, 16], backend)
}

/// Build the stress profile: the reference box at 8x the cell count.
pub fn stress_profile(backend: Backend) -> Result<ModelConfig, GridError> {
    profile([128, 128, 32], backend)
}

/// A model on `config` with a stratified `T`, uniform `S`, and seeded
/// random velocity perturbations.
pub fn seeded_model(config: ModelConfig, seed: u64) -> Result<Model, ModelError> {
    let mut model = Model::new(config)?;
    model.set("T", |_, _, z| 20.0 + 0.02 * z)?;
    model.set_uniform("S", 35.0)?;
    for (offset, name) in ["u", "v", "w"].into_iter().enumerate() {
        model.randomize(name, 0.1, seed.wrapping_add(offset as u64))?;
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_field::FieldAccess;

    #[test]
    fn reference_profile_validates() {
        let config = reference_profile(Backend::Serial).unwrap();
        config.validate().unwrap();
        assert_eq!(config.grid.interior_len(), 64 * 64 * 16);
    }

    #[test]
    fn stress_profile_validates() {
        stress_profile(Backend::Parallel).unwrap().validate().unwrap();
    }

    #[test]
    fn seeded_model_deterministic() {
        let config = reference_profile(Backend::Serial).unwrap();
        let a = seeded_model(config.clone(), 42).unwrap();
        let b = seeded_model(config, 42).unwrap();
        assert_eq!(a.field("u"), b.field("u"));
    }
}
