//! The read-only Field Accessor used by diagnostics and writers.
//!
//! These traits decouple callbacks from the concrete model type: a
//! diagnostic reads through `&dyn StateView` and never holds a reference
//! to the model beyond the duration of one call.

use shoal_core::Clock;

use crate::backend::Backend;
use crate::error::FieldError;
use crate::field::Field;
use crate::grid::RegularGrid;

/// Turbulence-closure coefficients needed by diffusive diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Closure {
    /// Kinematic viscosity applied to velocities, in m²/s.
    pub viscosity: f64,
    /// Diffusivity applied to tracers, in m²/s.
    pub diffusivity: f64,
}

impl Closure {
    /// The larger of the two coefficients.
    pub fn max_coefficient(&self) -> f64 {
        self.viscosity.max(self.diffusivity)
    }
}

/// Read-only access to named fields.
pub trait FieldAccess {
    /// Look up a field by name.
    ///
    /// Returns `None` if no field is registered under `name`.
    fn field(&self, name: &str) -> Option<&Field>;

    /// Names of every readable field, in a stable order.
    fn field_names(&self) -> Vec<&str>;

    /// Like [`field`](FieldAccess::field) but with a typed error.
    fn require_field(&self, name: &str) -> Result<&Field, FieldError> {
        self.field(name).ok_or_else(|| FieldError::UnknownField {
            name: name.to_string(),
        })
    }
}

/// The narrow view of model state that callbacks consume.
pub trait StateView: FieldAccess {
    /// Current iteration and model time.
    fn clock(&self) -> Clock;

    /// Grid geometry.
    fn grid(&self) -> &RegularGrid;

    /// Backend used for reductions over this state.
    fn backend(&self) -> Backend;

    /// Closure coefficients.
    fn closure(&self) -> Closure;

    /// Names of the tracer fields, in model order.
    fn tracer_names(&self) -> Vec<&str>;
}
