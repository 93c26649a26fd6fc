//! Scalar time series sampled from the state.

use std::fmt;

use indexmap::IndexMap;
use shoal_core::Trigger;
use shoal_field::StateView;

use crate::error::DiagnosticError;
use crate::reductions::{advective_cfl, diffusive_cfl, field_maximum};

/// A scalar sampled from the state.
pub type Probe = Box<dyn Fn(&dyn StateView) -> Result<f64, DiagnosticError> + Send>;

/// Key used for the single probe of [`Timeseries::new`].
pub const SINGLE_PROBE: &str = "value";

/// Appends one value per probe, plus the iteration and time, every time
/// its trigger fires.
pub struct Timeseries {
    probes: IndexMap<String, Probe>,
    trigger: Trigger,
    iterations: Vec<u64>,
    times: Vec<f64>,
    values: IndexMap<String, Vec<f64>>,
}

impl Timeseries {
    /// A series of a single function, stored under [`SINGLE_PROBE`].
    pub fn new<F>(f: F, trigger: Trigger) -> Self
    where
        F: Fn(&dyn StateView) -> f64 + Send + 'static,
    {
        Self::empty(trigger).with(SINGLE_PROBE, f)
    }

    /// A series with no probes; add them with [`with`](Self::with).
    pub fn empty(trigger: Trigger) -> Self {
        Self {
            probes: IndexMap::new(),
            trigger,
            iterations: Vec::new(),
            times: Vec::new(),
            values: IndexMap::new(),
        }
    }

    /// Add an infallible probe.
    pub fn with<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn StateView) -> f64 + Send + 'static,
    {
        self.with_probe(name, Box::new(move |s: &dyn StateView| Ok(f(s))))
    }

    /// Add a probe that may fail. Replaces any probe of the same name;
    /// values already recorded under that name are kept. A probe added
    /// after sampling has started reads NaN at the earlier samples, so
    /// every column stays as long as [`iterations`](Self::iterations).
    pub fn with_probe(mut self, name: impl Into<String>, probe: Probe) -> Self {
        let name = name.into();
        let samples = self.iterations.len();
        self.values
            .entry(name.clone())
            .or_insert_with(|| vec![f64::NAN; samples]);
        self.probes.insert(name, probe);
        self
    }

    /// Track the advective CFL number for step size `dt`.
    pub fn with_advective_cfl(self, name: impl Into<String>, dt: f64) -> Self {
        self.with_probe(name, Box::new(move |s: &dyn StateView| advective_cfl(s, dt)))
    }

    /// Track the diffusive CFL number for step size `dt`.
    pub fn with_diffusive_cfl(self, name: impl Into<String>, dt: f64) -> Self {
        self.with_probe(name, Box::new(move |s: &dyn StateView| Ok(diffusive_cfl(s, dt))))
    }

    /// Track `max(transform(field))`.
    pub fn with_field_maximum(
        self,
        name: impl Into<String>,
        field: impl Into<String>,
        transform: fn(f64) -> f64,
    ) -> Self {
        let field = field.into();
        self.with_probe(
            name,
            Box::new(move |s: &dyn StateView| field_maximum(s, &field, transform)),
        )
    }

    /// Schedule.
    pub fn trigger_mut(&mut self) -> &mut Trigger {
        &mut self.trigger
    }

    /// Evaluate every probe and append one sample.
    ///
    /// Probes are evaluated before anything is recorded, so a failing
    /// probe leaves the series unchanged.
    pub fn run(&mut self, state: &dyn StateView) -> Result<(), DiagnosticError> {
        let sample = self
            .probes
            .values()
            .map(|probe| probe(state))
            .collect::<Result<Vec<f64>, _>>()?;
        let clock = state.clock();
        self.iterations.push(clock.iteration);
        self.times.push(clock.time);
        for (name, value) in self.probes.keys().zip(sample) {
            self.values.entry(name.clone()).or_default().push(value);
        }
        Ok(())
    }

    /// Iterations at which samples were taken.
    pub fn iterations(&self) -> &[u64] {
        &self.iterations
    }

    /// Model times at which samples were taken.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Recorded values of one probe.
    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Probe names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.probes.keys().map(String::as_str)
    }

    /// Number of samples taken.
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    /// Returns `true` if no samples have been taken.
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }
}

impl fmt::Debug for Timeseries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeseries")
            .field("probes", &self.probes.keys().collect::<Vec<_>>())
            .field("trigger", &self.trigger)
            .field("samples", &self.iterations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_field::FieldAccess;
    use shoal_test_utils::fixtures::velocity_state;

    #[test]
    fn single_probe_records_clock() {
        let mut state = velocity_state(2.0);
        let mut series = Timeseries::new(
            |s| s.field("u").map_or(0.0, |u| u.get(0, 0, 0)),
            Trigger::iterations(1).unwrap(),
        );
        series.run(&state).unwrap();
        state.tick(0.5);
        series.run(&state).unwrap();
        assert_eq!(series.iterations(), [0, 1]);
        assert_eq!(series.times(), [0.0, 0.5]);
        assert_eq!(series.values(SINGLE_PROBE), Some(&[2.0, 2.0][..]));
    }

    #[test]
    fn named_probes_keep_order() {
        let state = velocity_state(1.0);
        let mut series = Timeseries::empty(Trigger::iterations(1).unwrap())
            .with_advective_cfl("cfl", 0.1)
            .with_diffusive_cfl("dcfl", 0.1)
            .with_field_maximum("umax", "u", f64::abs);
        series.run(&state).unwrap();
        assert_eq!(series.names().collect::<Vec<_>>(), ["cfl", "dcfl", "umax"]);
        assert_eq!(series.values("umax"), Some(&[1.0][..]));
        assert_eq!(series.values("dcfl"), Some(&[0.0][..]));
    }

    #[test]
    fn failing_probe_records_nothing() {
        let state = velocity_state(1.0);
        let mut series = Timeseries::empty(Trigger::iterations(1).unwrap())
            .with("one", |_| 1.0)
            .with_field_maximum("missing", "T", |x| x);
        assert!(series.run(&state).is_err());
        assert!(series.is_empty());
        assert_eq!(series.values("one"), Some(&[][..]));
    }

    #[test]
    fn late_column_is_aligned_with_samples() {
        let mut state = velocity_state(1.0);
        let mut series = Timeseries::empty(Trigger::iterations(1).unwrap()).with("one", |_| 1.0);
        series.run(&state).unwrap();
        state.tick(0.5);
        series.run(&state).unwrap();

        let mut series = series.with("two", |_| 2.0);
        state.tick(0.5);
        series.run(&state).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.values("one"), Some(&[1.0, 1.0, 1.0][..]));
        let two = series.values("two").unwrap();
        assert_eq!(two.len(), series.len());
        assert!(two[0].is_nan() && two[1].is_nan());
        assert_eq!(two[2], 2.0);
    }
}
