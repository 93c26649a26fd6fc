//! The reference model: prognostic state, tendency history, time stepping.

use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shoal_core::Clock;
use shoal_field::{Backend, Closure, Field, FieldAccess, FieldError, RegularGrid, StateView};

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::names::{previous_tendency_name, tendency_name, VELOCITIES};
use crate::tendencies::{impose_no_penetration, TracerTendency, VelocityTendencies};

/// How [`Model::step`] combines the current and previous tendencies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepMode {
    /// Forward Euler on iteration 0, Adams–Bashforth 2 afterwards.
    #[default]
    Auto,
    /// Force a Forward-Euler step (used on pickup when `G⁻` is stale).
    Euler,
    /// Force an Adams–Bashforth 2 step.
    Multistep,
}

/// A small hydrostatic-free fluid model on a [`RegularGrid`].
///
/// State is held as named [`Field`]s. Each prognostic field `c` has a
/// current tendency (accessor `G_c`) and a previous-step tendency
/// (accessor `G_c_prev`). All three families are visible through
/// [`FieldAccess`], so writers and checkpointers can persist them.
#[derive(Clone, Debug)]
pub struct Model {
    config: ModelConfig,
    clock: Clock,
    prognostic: IndexMap<String, Field>,
    tendencies: IndexMap<String, Field>,
    previous: IndexMap<String, Field>,
    accessor_names: Vec<String>,
}

impl Model {
    /// Build a model at rest with zero tendencies and a fresh clock.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let names = prognostic_names_of(&config);
        let zeros = || -> IndexMap<String, Field> {
            names
                .iter()
                .map(|n| (n.clone(), Field::zeros(&config.grid)))
                .collect()
        };
        let (prognostic, tendencies, previous) = (zeros(), zeros(), zeros());
        Ok(Self::assemble(
            config,
            Clock::new(),
            prognostic,
            tendencies,
            previous,
        ))
    }

    /// Rebuild a model from previously captured state.
    ///
    /// `fields` is keyed by accessor name and must contain every name in
    /// [`state_names`](Self::state_names) for `config`: each prognostic
    /// field plus both of its tendency buffers.
    pub fn from_parts(
        config: ModelConfig,
        clock: Clock,
        mut fields: IndexMap<String, Field>,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let names = prognostic_names_of(&config);
        let expected = config.grid.total_len();
        let mut take = |name: String| -> Result<Field, ModelError> {
            let field = fields
                .swap_remove(&name)
                .ok_or(ModelError::MissingField { name })?;
            if field.data().len() != expected || field.size() != config.grid.size() {
                return Err(FieldError::ShapeMismatch {
                    expected,
                    found: field.data().len(),
                }
                .into());
            }
            Ok(field)
        };

        let mut prognostic = IndexMap::new();
        let mut tendencies = IndexMap::new();
        let mut previous = IndexMap::new();
        for name in &names {
            prognostic.insert(name.clone(), take(name.clone())?);
            tendencies.insert(name.clone(), take(tendency_name(name))?);
            previous.insert(name.clone(), take(previous_tendency_name(name))?);
        }
        Ok(Self::assemble(
            config, clock, prognostic, tendencies, previous,
        ))
    }

    fn assemble(
        config: ModelConfig,
        clock: Clock,
        prognostic: IndexMap<String, Field>,
        tendencies: IndexMap<String, Field>,
        previous: IndexMap<String, Field>,
    ) -> Self {
        let mut accessor_names: Vec<String> = prognostic.keys().cloned().collect();
        accessor_names.extend(prognostic.keys().map(|n| tendency_name(n)));
        accessor_names.extend(prognostic.keys().map(|n| previous_tendency_name(n)));
        let mut model = Self {
            config,
            clock,
            prognostic,
            tendencies,
            previous,
            accessor_names,
        };
        model.fill_halos();
        model
    }

    /// The configuration this model was built from.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Names of the prognostic fields: velocities, then tracers.
    pub fn prognostic_names(&self) -> impl Iterator<Item = &str> {
        self.prognostic.keys().map(String::as_str)
    }

    /// Every accessor name that must be captured to resume this model
    /// bit-for-bit.
    pub fn state_names(&self) -> &[String] {
        &self.accessor_names
    }

    /// Switch the reduction backend handed to callbacks.
    pub fn set_backend(&mut self, backend: Backend) {
        self.config.backend = backend;
    }

    /// Set a prognostic field from a function of cell-centre position.
    pub fn set<F>(&mut self, name: &str, f: F) -> Result<(), ModelError>
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let grid = self.config.grid.clone();
        self.prognostic_mut(name)?.set_with(&grid, f);
        self.fill_halos();
        Ok(())
    }

    /// Set a prognostic field to a constant.
    pub fn set_uniform(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        self.set(name, |_, _, _| value)
    }

    /// Add uniform noise in `[-amplitude, amplitude]` to a prognostic
    /// field's interior. The same `seed` always produces the same noise.
    pub fn randomize(&mut self, name: &str, amplitude: f64, seed: u64) -> Result<(), ModelError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let field = self.prognostic_mut(name)?;
        for n in 0..field.interior_len() {
            let off = field.interior_offset(n);
            let noise = amplitude * (2.0 * rng.random::<f64>() - 1.0);
            field.data_mut()[off] += noise;
        }
        self.fill_halos();
        Ok(())
    }

    fn prognostic_mut(&mut self, name: &str) -> Result<&mut Field, ModelError> {
        self.prognostic
            .get_mut(name)
            .ok_or_else(|| ModelError::MissingField {
                name: name.to_string(),
            })
    }

    /// Advance the model by `dt`.
    ///
    /// The current tendencies become the previous ones, new tendencies
    /// are evaluated from the current state, and every prognostic field
    /// is updated. On success the clock advances by one iteration and
    /// `dt`.
    pub fn step(&mut self, dt: f64, mode: StepMode) -> Result<(), ModelError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ModelError::InvalidTimeStep { dt });
        }
        let euler = match mode {
            StepMode::Auto => self.clock.iteration == 0,
            StepMode::Euler => true,
            StepMode::Multistep => false,
        };

        self.fill_halos();
        std::mem::swap(&mut self.tendencies, &mut self.previous);
        self.compute_tendencies()?;

        let (a, b) = if euler {
            (1.0, 0.0)
        } else {
            let chi = self.config.ab2_chi;
            (1.5 + chi, 0.5 + chi)
        };
        let updates = self
            .prognostic
            .values_mut()
            .zip(self.tendencies.values())
            .zip(self.previous.values());
        for ((c, g), g_prev) in updates {
            for n in 0..c.interior_len() {
                let off = c.interior_offset(n);
                let increment = a * g.data()[off] - b * g_prev.data()[off];
                c.data_mut()[off] += dt * increment;
            }
        }

        self.fill_halos();
        self.clock.tick(dt);
        Ok(())
    }

    fn compute_tendencies(&mut self) -> Result<(), ModelError> {
        let grid = &self.config.grid;
        let mut fields = self.prognostic.values();
        let mut gs = self.tendencies.values_mut();
        let (Some(u), Some(v), Some(w)) = (fields.next(), fields.next(), fields.next()) else {
            return Err(ModelError::MissingField {
                name: VELOCITIES[0].to_string(),
            });
        };
        let (Some(gu), Some(gv), Some(gw)) = (gs.next(), gs.next(), gs.next()) else {
            return Err(ModelError::MissingField {
                name: tendency_name(VELOCITIES[0]),
            });
        };

        VelocityTendencies {
            grid,
            viscosity: self.config.closure.viscosity,
            coriolis: self.config.coriolis,
        }
        .evaluate(u, v, w, gu, gv, gw);

        let tracer = TracerTendency {
            grid,
            diffusivity: self.config.closure.diffusivity,
        };
        for (c, gc) in fields.zip(gs) {
            tracer.evaluate(c, u, v, w, gc);
        }
        Ok(())
    }

    fn fill_halos(&mut self) {
        for (name, field) in self.prognostic.iter_mut() {
            field.fill_halo_regions();
            if name == VELOCITIES[2] {
                impose_no_penetration(field);
            }
        }
    }
}

fn prognostic_names_of(config: &ModelConfig) -> Vec<String> {
    VELOCITIES
        .iter()
        .map(|v| v.to_string())
        .chain(config.tracers.iter().cloned())
        .collect()
}

impl FieldAccess for Model {
    fn field(&self, name: &str) -> Option<&Field> {
        if let Some(f) = self.prognostic.get(name) {
            return Some(f);
        }
        let rest = name.strip_prefix("G_")?;
        if let Some(g) = self.tendencies.get(rest) {
            return Some(g);
        }
        self.previous.get(rest.strip_suffix("_prev")?)
    }

    fn field_names(&self) -> Vec<&str> {
        self.accessor_names.iter().map(String::as_str).collect()
    }
}

impl StateView for Model {
    fn clock(&self) -> Clock {
        self.clock
    }

    fn grid(&self) -> &RegularGrid {
        &self.config.grid
    }

    fn backend(&self) -> Backend {
        self.config.backend
    }

    fn closure(&self) -> Closure {
        self.config.closure
    }

    fn tracer_names(&self) -> Vec<&str> {
        self.config.tracers.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RegularGrid {
        RegularGrid::new([6, 5, 4], [1.0, 1.0, 1.0], [1, 1, 1]).unwrap()
    }

    fn model() -> Model {
        Model::new(ModelConfig::new(grid())).unwrap()
    }

    #[test]
    fn accessor_names_cover_state() {
        let m = model();
        let names = m.field_names();
        assert_eq!(names.len(), 15);
        for expected in ["u", "w", "T", "S", "G_u", "G_S", "G_v_prev", "G_T_prev"] {
            assert!(names.contains(&expected), "missing {expected}");
            assert!(m.field(expected).is_some());
        }
        assert!(m.field("G_X").is_none());
        assert!(m.field("nope").is_none());
    }

    #[test]
    fn rejects_bad_time_step() {
        let mut m = model();
        assert_eq!(
            m.step(0.0, StepMode::Auto),
            Err(ModelError::InvalidTimeStep { dt: 0.0 })
        );
        assert!(m.step(f64::NAN, StepMode::Auto).is_err());
        assert_eq!(m.clock().iteration, 0);
    }

    #[test]
    fn step_advances_clock() {
        let mut m = model();
        m.step(0.5, StepMode::Auto).unwrap();
        m.step(0.25, StepMode::Auto).unwrap();
        assert_eq!(m.clock().iteration, 2);
        assert!((m.clock().time - 0.75).abs() < 1e-12);
    }

    #[test]
    fn euler_then_adams_bashforth() {
        let f = 1e-2;
        let dt = 0.1;
        let mut config = ModelConfig::new(grid());
        config.coriolis = f;
        let chi = config.ab2_chi;
        let mut m = Model::new(config).unwrap();
        m.set_uniform("u", 1.0).unwrap();

        m.step(dt, StepMode::Auto).unwrap();
        let v1 = m.field("v").unwrap().get(2, 2, 1);
        assert!((v1 + f * dt).abs() < 1e-15);
        assert_eq!(m.field("G_v_prev").unwrap().get(2, 2, 1), 0.0);

        m.step(dt, StepMode::Auto).unwrap();
        let u2 = m.field("u").unwrap().get(2, 2, 1);
        let v2 = m.field("v").unwrap().get(2, 2, 1);
        let expected_u = 1.0 - dt * (1.5 + chi) * f * f * dt;
        assert!((u2 - expected_u).abs() < 1e-14);
        assert!((v2 + 2.0 * f * dt).abs() < 1e-14);
        assert!((m.field("G_v_prev").unwrap().get(2, 2, 1) + f).abs() < 1e-15);
    }

    #[test]
    fn uniform_tracer_is_preserved() {
        let mut config = ModelConfig::new(grid());
        config.closure = Closure {
            viscosity: 1e-3,
            diffusivity: 1e-3,
        };
        let mut m = Model::new(config).unwrap();
        m.set_uniform("T", 20.0).unwrap();
        m.set("u", |_, y, _| 0.1 * y).unwrap();
        for _ in 0..5 {
            m.step(0.01, StepMode::Auto).unwrap();
        }
        let t = m.field("T").unwrap();
        assert!(t.interior().iter().all(|&x| (x - 20.0).abs() < 1e-12));
    }

    #[test]
    fn w_stays_zero_at_bottom() {
        let mut m = model();
        m.set_uniform("w", 1.0).unwrap();
        let w = m.field("w").unwrap();
        assert_eq!(w.get(0, 0, 0), 0.0);
        assert_eq!(w.get(0, 0, 1), 1.0);
    }

    #[test]
    fn randomize_is_seeded() {
        let mut a = model();
        let mut b = model();
        a.randomize("T", 0.5, 42).unwrap();
        b.randomize("T", 0.5, 42).unwrap();
        assert_eq!(a.field("T"), b.field("T"));
        assert!(a
            .field("T")
            .unwrap()
            .interior()
            .iter()
            .all(|x| x.abs() <= 0.5));
        assert!(a.randomize("nope", 1.0, 0).is_err());
    }

    #[test]
    fn from_parts_round_trips() {
        let mut m = model();
        m.randomize("u", 0.1, 1).unwrap();
        m.randomize("T", 0.1, 2).unwrap();
        m.step(0.1, StepMode::Auto).unwrap();
        m.step(0.1, StepMode::Auto).unwrap();

        let fields: IndexMap<String, Field> = m
            .state_names()
            .iter()
            .map(|n| (n.clone(), m.field(n).unwrap().clone()))
            .collect();
        let restored = Model::from_parts(m.config().clone(), m.clock(), fields).unwrap();
        for name in m.state_names() {
            assert_eq!(m.field(name), restored.field(name), "{name}");
        }
    }

    #[test]
    fn from_parts_reports_missing_field() {
        let m = model();
        let mut fields: IndexMap<String, Field> = m
            .state_names()
            .iter()
            .map(|n| (n.clone(), m.field(n).unwrap().clone()))
            .collect();
        fields.swap_remove("G_S_prev");
        let err = Model::from_parts(m.config().clone(), m.clock(), fields).unwrap_err();
        assert_eq!(
            err,
            ModelError::MissingField {
                name: "G_S_prev".into()
            }
        );
    }
}
