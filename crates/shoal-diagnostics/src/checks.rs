//! Sanity checks that can stop a run: non-finite values and divergence.

use shoal_core::Trigger;
use shoal_field::{Reduction, StateView};
use smallvec::SmallVec;

use crate::error::DiagnosticError;

/// Scans fields, halos included, for NaN or infinite values.
#[derive(Clone, Debug)]
pub struct NaNChecker {
    fields: SmallVec<[String; 4]>,
    trigger: Trigger,
}

impl NaNChecker {
    /// Check `fields` whenever `trigger` fires.
    pub fn new<I, S>(fields: I, trigger: Trigger) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            trigger,
        }
    }

    /// Names of the checked fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// Fail with [`DiagnosticError::NonFiniteValue`] on the first field,
    /// in registration order, that holds a non-finite value.
    ///
    /// A field the state does not have is fatal too
    /// ([`DiagnosticError::UncheckableField`]).
    pub fn run(&self, state: &dyn StateView) -> Result<(), DiagnosticError> {
        let backend = state.backend();
        for name in &self.fields {
            let field = state
                .require_field(name)
                .map_err(|error| DiagnosticError::UncheckableField {
                    checker: "NaN checker",
                    error,
                })?;
            if backend.any_non_finite(field.data()) {
                let clock = state.clock();
                log::error!("non-finite value in field '{name}' at {clock}");
                return Err(DiagnosticError::NonFiniteValue {
                    field: name.clone(),
                    iteration: clock.iteration,
                    time: clock.time,
                });
            }
        }
        Ok(())
    }
}

/// Summary of cell divergences over the interior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DivergenceStats {
    /// Smallest cell divergence.
    pub min: f64,
    /// Mean cell divergence.
    pub mean: f64,
    /// Largest cell divergence.
    pub max: f64,
}

impl DivergenceStats {
    /// Largest absolute divergence, or NaN if any statistic is NaN.
    pub fn magnitude(&self) -> f64 {
        if self.min.is_nan() || self.mean.is_nan() || self.max.is_nan() {
            return f64::NAN;
        }
        self.min.abs().max(self.max.abs())
    }
}

/// Checks the discrete divergence of the C-grid velocity.
///
/// Above `warn` a warning is logged and the run continues; above
/// `abort`, or when the divergence is NaN, an error is logged and a
/// fatal [`DiagnosticError::DivergenceAbort`] is returned.
#[derive(Clone, Debug)]
pub struct VelocityDivergenceChecker {
    warn: f64,
    abort: f64,
    trigger: Trigger,
    latest: Option<DivergenceStats>,
}

impl VelocityDivergenceChecker {
    /// Both thresholds must be finite and non-negative with `warn <= abort`.
    pub fn new(warn: f64, abort: f64, trigger: Trigger) -> Result<Self, DiagnosticError> {
        if !warn.is_finite() || !abort.is_finite() || warn < 0.0 || warn > abort {
            return Err(DiagnosticError::InvalidConfig {
                reason: format!(
                    "divergence thresholds need 0 <= warn <= abort, got warn={warn}, abort={abort}"
                ),
            });
        }
        Ok(Self {
            warn,
            abort,
            trigger,
            latest: None,
        })
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// Statistics from the last run.
    pub fn latest(&self) -> Option<DivergenceStats> {
        self.latest
    }

    /// Compute divergence statistics and apply the thresholds.
    pub fn run(&mut self, state: &dyn StateView) -> Result<DivergenceStats, DiagnosticError> {
        let stats = divergence(state).map_err(|e| match e {
            DiagnosticError::Field(error) => DiagnosticError::UncheckableField {
                checker: "velocity divergence checker",
                error,
            },
            other => other,
        })?;
        self.latest = Some(stats);
        let magnitude = stats.magnitude();
        let iteration = state.clock().iteration;
        if magnitude.is_nan() || magnitude >= self.abort {
            log::error!(
                "velocity divergence {magnitude:e} >= abort threshold {:e} at iteration {iteration} \
                 (min={:e}, mean={:e}, max={:e})",
                self.abort,
                stats.min,
                stats.mean,
                stats.max
            );
            return Err(DiagnosticError::DivergenceAbort {
                min: stats.min,
                mean: stats.mean,
                max: stats.max,
                iteration,
            });
        }
        if magnitude >= self.warn {
            log::warn!(
                "velocity divergence {magnitude:e} >= {:e} at iteration {iteration} \
                 (min={:e}, mean={:e}, max={:e})",
                self.warn,
                stats.min,
                stats.mean,
                stats.max
            );
        }
        Ok(stats)
    }
}

/// Divergence `∂u/∂x + ∂v/∂y + ∂w/∂z` of every interior cell, summarised.
///
/// A NaN in any cell makes every statistic NaN.
pub fn divergence(state: &dyn StateView) -> Result<DivergenceStats, DiagnosticError> {
    let u = state.require_field("u")?;
    let v = state.require_field("v")?;
    let w = state.require_field("w")?;
    let grid = state.grid();
    let backend = state.backend();
    let [nx, ny, _] = grid.size();
    let (dx, dy, dz) = (grid.dx(), grid.dy(), grid.dz());
    let n = grid.interior_len();

    let cell = |n: usize| {
        let i = (n % nx) as isize;
        let j = ((n / nx) % ny) as isize;
        let k = (n / (nx * ny)) as isize;
        (u.get(i + 1, j, k) - u.get(i, j, k)) / dx
            + (v.get(i, j + 1, k) - v.get(i, j, k)) / dy
            + (w.get(i, j, k + 1) - w.get(i, j, k)) / dz
    };
    let min = backend.map_reduce(n, Reduction::Min, cell);
    let max = backend.map_reduce(n, Reduction::Max, cell);
    let mean = backend.map_reduce(n, Reduction::Sum, cell) / n as f64;
    // Min and Max skip NaNs; the sum does not.
    if mean.is_nan() {
        return Ok(DivergenceStats {
            min: f64::NAN,
            mean,
            max: f64::NAN,
        });
    }
    Ok(DivergenceStats { min, mean, max })
}
