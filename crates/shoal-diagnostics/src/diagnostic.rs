//! The closed set of diagnostic kinds.

use shoal_core::Trigger;
use shoal_field::StateView;

use crate::average::HorizontalAverage;
use crate::checks::{NaNChecker, VelocityDivergenceChecker};
use crate::error::DiagnosticError;
use crate::reductions::{AdvectiveCfl, DiffusiveCfl, FieldMaximum};
use crate::timeseries::Timeseries;

/// One scheduled diagnostic.
#[derive(Debug)]
pub enum Diagnostic {
    /// Vertical profile of a horizontal mean.
    HorizontalAverage(HorizontalAverage),
    /// Non-finite value scan.
    NaNChecker(NaNChecker),
    /// Discrete divergence check of the velocity.
    VelocityDivergence(VelocityDivergenceChecker),
    /// Maximum of a transformed field.
    FieldMaximum(FieldMaximum),
    /// Advective CFL number.
    AdvectiveCfl(AdvectiveCfl),
    /// Diffusive CFL number.
    DiffusiveCfl(DiffusiveCfl),
    /// Sampled scalar time series.
    Timeseries(Timeseries),
}

/// The latest result held by a [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DiagnosticOutput<'a> {
    /// A vertical profile including padding levels.
    Profile(&'a [f64]),
    /// A single scalar.
    Scalar(f64),
    /// A sampled series.
    Series {
        /// Sample iterations.
        iterations: &'a [u64],
        /// Sample times.
        times: &'a [f64],
    },
    /// Nothing has been computed yet, or the diagnostic only checks.
    None,
}

impl Diagnostic {
    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HorizontalAverage(_) => "horizontal_average",
            Self::NaNChecker(_) => "nan_checker",
            Self::VelocityDivergence(_) => "velocity_divergence",
            Self::FieldMaximum(_) => "field_maximum",
            Self::AdvectiveCfl(_) => "advective_cfl",
            Self::DiffusiveCfl(_) => "diffusive_cfl",
            Self::Timeseries(_) => "timeseries",
        }
    }

    /// This diagnostic's schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        match self {
            Self::HorizontalAverage(d) => d.trigger_mut(),
            Self::NaNChecker(d) => d.trigger_mut(),
            Self::VelocityDivergence(d) => d.trigger_mut(),
            Self::FieldMaximum(d) => d.trigger_mut(),
            Self::AdvectiveCfl(d) => d.trigger_mut(),
            Self::DiffusiveCfl(d) => d.trigger_mut(),
            Self::Timeseries(d) => d.trigger_mut(),
        }
    }

    /// Run now, ignoring the schedule.
    pub fn run(&mut self, state: &dyn StateView) -> Result<(), DiagnosticError> {
        match self {
            Self::HorizontalAverage(d) => d.run(state).map(drop),
            Self::NaNChecker(d) => d.run(state),
            Self::VelocityDivergence(d) => d.run(state).map(drop),
            Self::FieldMaximum(d) => d.run(state).map(drop),
            Self::AdvectiveCfl(d) => d.run(state).map(drop),
            Self::DiffusiveCfl(d) => {
                d.run(state);
                Ok(())
            }
            Self::Timeseries(d) => d.run(state),
        }
    }

    /// Run if the trigger fires at the state's clock.
    ///
    /// Returns `Ok(true)` if the diagnostic ran.
    pub fn run_if_scheduled(&mut self, state: &dyn StateView) -> Result<bool, DiagnosticError> {
        if !self.trigger_mut().should_fire(&state.clock()) {
            return Ok(false);
        }
        self.run(state)?;
        Ok(true)
    }

    /// The latest stored result.
    pub fn output(&self) -> DiagnosticOutput<'_> {
        let scalar = |v: Option<f64>| v.map_or(DiagnosticOutput::None, DiagnosticOutput::Scalar);
        match self {
            Self::HorizontalAverage(d) => d
                .profile()
                .map_or(DiagnosticOutput::None, DiagnosticOutput::Profile),
            Self::NaNChecker(_) => DiagnosticOutput::None,
            Self::VelocityDivergence(d) => scalar(d.latest().map(|s| s.magnitude())),
            Self::FieldMaximum(d) => scalar(d.latest()),
            Self::AdvectiveCfl(d) => scalar(d.latest()),
            Self::DiffusiveCfl(d) => scalar(d.latest()),
            Self::Timeseries(d) => DiagnosticOutput::Series {
                iterations: d.iterations(),
                times: d.times(),
            },
        }
    }

    /// The inner time series, if this is one.
    pub fn as_timeseries(&self) -> Option<&Timeseries> {
        match self {
            Self::Timeseries(t) => Some(t),
            _ => None,
        }
    }
}

impl From<HorizontalAverage> for Diagnostic {
    fn from(d: HorizontalAverage) -> Self {
        Self::HorizontalAverage(d)
    }
}

impl From<NaNChecker> for Diagnostic {
    fn from(d: NaNChecker) -> Self {
        Self::NaNChecker(d)
    }
}

impl From<VelocityDivergenceChecker> for Diagnostic {
    fn from(d: VelocityDivergenceChecker) -> Self {
        Self::VelocityDivergence(d)
    }
}

impl From<FieldMaximum> for Diagnostic {
    fn from(d: FieldMaximum) -> Self {
        Self::FieldMaximum(d)
    }
}

impl From<AdvectiveCfl> for Diagnostic {
    fn from(d: AdvectiveCfl) -> Self {
        Self::AdvectiveCfl(d)
    }
}

impl From<DiffusiveCfl> for Diagnostic {
    fn from(d: DiffusiveCfl) -> Self {
        Self::DiffusiveCfl(d)
    }
}

impl From<Timeseries> for Diagnostic {
    fn from(d: Timeseries) -> Self {
        Self::Timeseries(d)
    }
}
