//! Model configuration and validation.

use shoal_field::{Backend, Closure, RegularGrid};

use crate::error::ModelError;
use crate::names::is_valid_tracer_name;

/// Everything needed to construct a [`Model`](crate::Model) apart from
/// its state. Checkpoints serialise this alongside the fields so a
/// restored model has identical configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Grid geometry.
    pub grid: RegularGrid,
    /// Viscosity and tracer diffusivity.
    pub closure: Closure,
    /// Coriolis parameter `f`, in 1/s.
    pub coriolis: f64,
    /// Adams–Bashforth 2 stabilisation parameter `χ`. Default: 0.1.
    pub ab2_chi: f64,
    /// Tracer names, in model order. Default: `["T", "S"]`.
    pub tracers: Vec<String>,
    /// Reduction backend handed to callbacks.
    pub backend: Backend,
}

impl ModelConfig {
    /// Defaults on `grid`: no diffusion, no rotation, `χ = 0.1`,
    /// tracers `T` and `S`, serial backend.
    pub fn new(grid: RegularGrid) -> Self {
        Self {
            grid,
            closure: Closure::default(),
            coriolis: 0.0,
            ab2_chi: 0.1,
            tracers: vec!["T".to_string(), "S".to_string()],
            backend: Backend::Serial,
        }
    }

    /// Check coefficient and naming invariants.
    pub fn validate(&self) -> Result<(), ModelError> {
        let Closure {
            viscosity,
            diffusivity,
        } = self.closure;
        if !viscosity.is_finite() || viscosity < 0.0 {
            return Err(ModelError::InvalidConfig {
                reason: format!("viscosity must be finite and >= 0, got {viscosity}"),
            });
        }
        if !diffusivity.is_finite() || diffusivity < 0.0 {
            return Err(ModelError::InvalidConfig {
                reason: format!("diffusivity must be finite and >= 0, got {diffusivity}"),
            });
        }
        if !self.coriolis.is_finite() {
            return Err(ModelError::InvalidConfig {
                reason: format!("coriolis parameter must be finite, got {}", self.coriolis),
            });
        }
        if !self.ab2_chi.is_finite() {
            return Err(ModelError::InvalidConfig {
                reason: format!("ab2_chi must be finite, got {}", self.ab2_chi),
            });
        }
        for (n, name) in self.tracers.iter().enumerate() {
            if !is_valid_tracer_name(name) {
                return Err(ModelError::InvalidConfig {
                    reason: format!("invalid tracer name '{name}'"),
                });
            }
            if self.tracers[..n].contains(name) {
                return Err(ModelError::InvalidConfig {
                    reason: format!("duplicate tracer name '{name}'"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RegularGrid {
        RegularGrid::new([4, 4, 4], [1.0; 3], [1; 3]).unwrap()
    }

    #[test]
    fn defaults_validate() {
        assert!(ModelConfig::new(grid()).validate().is_ok());
    }

    #[test]
    fn negative_viscosity_rejected() {
        let mut config = ModelConfig::new(grid());
        config.closure.viscosity = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn duplicate_tracers_rejected() {
        let mut config = ModelConfig::new(grid());
        config.tracers = vec!["T".into(), "T".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn tracer_shadowing_velocity_rejected() {
        let mut config = ModelConfig::new(grid());
        config.tracers = vec!["u".into()];
        assert!(config.validate().is_err());
    }
}
