//! Horizontal averages: vertical profiles of one field or a product.

use shoal_core::Trigger;
use shoal_field::{Field, Reduction, StateView};
use smallvec::SmallVec;

use crate::error::DiagnosticError;

/// Mean over the interior `x`–`y` plane at every vertical level.
///
/// The profile has `nz + 2` entries: physical levels sit at `1..=nz`
/// and entries `0` and `nz + 1` hold the same average taken over the
/// nearest halo layer below and above. With several fields, the mean of
/// their cell-wise product is taken (e.g. `["w", "T"]` gives the
/// vertical tracer flux `⟨wT⟩`).
///
/// # Examples
///
/// ```
/// use shoal_core::Trigger;
/// use shoal_diagnostics::HorizontalAverage;
///
/// let avg = HorizontalAverage::new(["w", "T"], Trigger::iterations(10).unwrap()).unwrap();
/// assert_eq!(avg.fields(), ["w", "T"]);
/// assert!(avg.profile().is_none());
/// ```
#[derive(Clone, Debug)]
pub struct HorizontalAverage {
    fields: SmallVec<[String; 2]>,
    trigger: Trigger,
    profile: Option<Vec<f64>>,
}

impl HorizontalAverage {
    /// Average of `fields` (their product if more than one).
    pub fn new<I, S>(fields: I, trigger: Trigger) -> Result<Self, DiagnosticError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: SmallVec<[String; 2]> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(DiagnosticError::InvalidConfig {
                reason: "horizontal average needs at least one field".into(),
            });
        }
        Ok(Self {
            fields,
            trigger,
            profile: None,
        })
    }

    /// Names of the averaged fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// The most recently computed profile.
    pub fn profile(&self) -> Option<&[f64]> {
        self.profile.as_deref()
    }

    /// Compute the profile now and store it.
    pub fn run(&mut self, state: &dyn StateView) -> Result<&[f64], DiagnosticError> {
        let profile = self.compute(state)?;
        Ok(self.profile.insert(profile).as_slice())
    }

    /// Compute the profile without storing it.
    pub fn compute(&self, state: &dyn StateView) -> Result<Vec<f64>, DiagnosticError> {
        let fields = self
            .fields
            .iter()
            .map(|name| state.require_field(name))
            .collect::<Result<SmallVec<[&Field; 2]>, _>>()?;
        let grid = state.grid();
        let backend = state.backend();
        let (nx, ny, nz) = (grid.nx(), grid.ny(), grid.nz() as isize);
        let plane = nx * ny;

        let profile = (-1..=nz)
            .map(|k| {
                let sum = backend.map_reduce(plane, Reduction::Sum, |n| {
                    let i = (n % nx) as isize;
                    let j = (n / nx) as isize;
                    fields.iter().map(|f| f.get(i, j, k)).product::<f64>()
                });
                sum / plane as f64
            })
            .collect();
        Ok(profile)
    }
}
