//! Scalar reductions: field maxima and CFL numbers.
//!
//! Each reduction is a pure function of the state (and `Δt` for CFL
//! numbers) via `compute`. The scheduled forms also remember the latest
//! value.

use shoal_core::Trigger;
use shoal_field::{Axis, Reduction, StateView};

use crate::error::DiagnosticError;

/// Maximum of `transform(c)` over the interior of one field.
///
/// ```
/// use shoal_core::Trigger;
/// use shoal_diagnostics::FieldMaximum;
///
/// let max_speed = FieldMaximum::new("u", f64::abs, Trigger::iterations(1).unwrap());
/// assert_eq!(max_speed.field(), "u");
/// ```
#[derive(Clone, Debug)]
pub struct FieldMaximum {
    field: String,
    transform: fn(f64) -> f64,
    trigger: Trigger,
    latest: Option<f64>,
}

impl FieldMaximum {
    /// Maximum of `transform` applied to `field`.
    pub fn new(field: impl Into<String>, transform: fn(f64) -> f64, trigger: Trigger) -> Self {
        Self {
            field: field.into(),
            transform,
            trigger,
            latest: None,
        }
    }

    /// Name of the reduced field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// The most recent scheduled value.
    pub fn latest(&self) -> Option<f64> {
        self.latest
    }

    /// Compute the maximum now.
    pub fn compute(&self, state: &dyn StateView) -> Result<f64, DiagnosticError> {
        field_maximum(state, &self.field, self.transform)
    }

    /// Compute and store.
    pub fn run(&mut self, state: &dyn StateView) -> Result<f64, DiagnosticError> {
        let value = self.compute(state)?;
        log::debug!("max {} = {value:e}", self.field);
        self.latest = Some(value);
        Ok(value)
    }
}

/// `max(transform(c))` over the interior of `name`.
pub fn field_maximum(
    state: &dyn StateView,
    name: &str,
    transform: fn(f64) -> f64,
) -> Result<f64, DiagnosticError> {
    let field = state.require_field(name)?;
    Ok(state
        .backend()
        .map_reduce(field.interior_len(), Reduction::Max, |n| {
            transform(field.data()[field.interior_offset(n)])
        }))
}

/// Advective CFL number for a fixed `Δt`.
///
/// `Δt · max over cells of max(|u|/Δx, |v|/Δy, |w|/Δz)`.
#[derive(Clone, Debug)]
pub struct AdvectiveCfl {
    dt: f64,
    trigger: Trigger,
    latest: Option<f64>,
}

impl AdvectiveCfl {
    /// CFL for step size `dt`.
    pub fn new(dt: f64, trigger: Trigger) -> Result<Self, DiagnosticError> {
        check_dt(dt)?;
        Ok(Self {
            dt,
            trigger,
            latest: None,
        })
    }

    /// The step size used.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// The most recent scheduled value.
    pub fn latest(&self) -> Option<f64> {
        self.latest
    }

    /// Compute the CFL number now.
    pub fn compute(&self, state: &dyn StateView) -> Result<f64, DiagnosticError> {
        advective_cfl(state, self.dt)
    }

    /// Compute and store.
    pub fn run(&mut self, state: &dyn StateView) -> Result<f64, DiagnosticError> {
        let value = self.compute(state)?;
        log::debug!("advective CFL = {value:e}");
        self.latest = Some(value);
        Ok(value)
    }
}

/// `Δt · max(|u|/Δx, |v|/Δy, |w|/Δz)` over interior cells.
pub fn advective_cfl(state: &dyn StateView, dt: f64) -> Result<f64, DiagnosticError> {
    let u = state.require_field("u")?;
    let v = state.require_field("v")?;
    let w = state.require_field("w")?;
    let grid = state.grid();
    let [dx, dy, dz] = Axis::ALL.map(|a| grid.spacing(a));
    let rate = state
        .backend()
        .map_reduce(grid.interior_len(), Reduction::Max, |n| {
            let off = u.interior_offset(n);
            (u.data()[off].abs() / dx)
                .max(v.data()[off].abs() / dy)
                .max(w.data()[off].abs() / dz)
        });
    Ok(dt * rate)
}

/// Diffusive CFL number for a fixed `Δt`.
///
/// `Δt · max(ν, κ) / min(Δx, Δy, Δz)²`.
#[derive(Clone, Debug)]
pub struct DiffusiveCfl {
    dt: f64,
    trigger: Trigger,
    latest: Option<f64>,
}

impl DiffusiveCfl {
    /// CFL for step size `dt`.
    pub fn new(dt: f64, trigger: Trigger) -> Result<Self, DiagnosticError> {
        check_dt(dt)?;
        Ok(Self {
            dt,
            trigger,
            latest: None,
        })
    }

    /// The step size used.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// The most recent scheduled value.
    pub fn latest(&self) -> Option<f64> {
        self.latest
    }

    /// Compute the CFL number now.
    pub fn compute(&self, state: &dyn StateView) -> f64 {
        diffusive_cfl(state, self.dt)
    }

    /// Compute and store.
    pub fn run(&mut self, state: &dyn StateView) -> f64 {
        let value = self.compute(state);
        log::debug!("diffusive CFL = {value:e}");
        self.latest = Some(value);
        value
    }
}

/// `Δt · max(ν, κ) / min(Δx, Δy, Δz)²`.
pub fn diffusive_cfl(state: &dyn StateView, dt: f64) -> f64 {
    let h = state.grid().min_spacing();
    dt * state.closure().max_coefficient() / (h * h)
}

fn check_dt(dt: f64) -> Result<(), DiagnosticError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(DiagnosticError::InvalidConfig {
            reason: format!("CFL time step must be finite and positive, got {dt}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_test_utils::fixtures::{linear_tracer_state, small_grid, velocity_state};
    use shoal_test_utils::MockState;

    fn every() -> Trigger {
        Trigger::iterations(1).unwrap()
    }

    #[test]
    fn advective_cfl_of_uniform_flow() {
        let u0 = 0.7;
        let dt = 0.01;
        let state = velocity_state(u0);
        let dx = state.grid().dx();
        let cfl = advective_cfl(&state, dt).unwrap();
        assert!((cfl - dt * u0 / dx).abs() < 1e-14);
    }

    #[test]
    fn advective_cfl_takes_worst_axis() {
        let mut state = velocity_state(0.1);
        state.set_with("w", |_, _, _| -0.2);
        let grid = state.grid().clone();
        let cfl = advective_cfl(&state, 1.0).unwrap();
        let expected = (0.1 / grid.dx()).max(0.2 / grid.dz());
        assert!((cfl - expected).abs() < 1e-14);
    }

    #[test]
    fn diffusive_cfl_uses_largest_coefficient() {
        let state = MockState::new(small_grid()).with_closure(1e-3, 4e-3);
        let h = small_grid().min_spacing();
        let cfl = diffusive_cfl(&state, 2.0);
        assert!((cfl - 2.0 * 4e-3 / (h * h)).abs() < 1e-14);
    }

    #[test]
    fn field_maximum_applies_transform() {
        let state = linear_tracer_state(0.0, 3.0);
        let raw = field_maximum(&state, "T", |x| x).unwrap();
        let abs = field_maximum(&state, "T", f64::abs).unwrap();
        assert!(raw < 0.0);
        assert!(abs > 2.5);
    }

    #[test]
    fn scheduled_forms_remember_latest() {
        let state = velocity_state(1.0);
        let mut cfl = AdvectiveCfl::new(0.1, every()).unwrap();
        assert!(cfl.latest().is_none());
        let value = cfl.run(&state).unwrap();
        assert_eq!(cfl.latest(), Some(value));
        assert!(AdvectiveCfl::new(0.0, every()).is_err());
        assert!(DiffusiveCfl::new(-1.0, every()).is_err());
    }
}
