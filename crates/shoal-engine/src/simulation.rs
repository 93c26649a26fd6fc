//! The simulation driver.
//!
//! [`Simulation`] owns a [`Model`], its [`Diagnostics`] and its
//! [`Outputs`], and steps until the configured stop criterion is met.
//!
//! # Ownership model
//!
//! Callbacks never hold a reference to the model between steps. Each
//! one borrows the model as `&dyn StateView` for the duration of a
//! single call, so restoring a checkpoint can replace the model
//! wholesale.

use std::path::Path;

use shoal_core::Clock;
use shoal_diagnostics::Diagnostics;
use shoal_field::StateView;
use shoal_model::{Model, StepMode};
use shoal_output::{latest_checkpoint, CheckpointError, Checkpointer, OutputWriter};

use crate::config::SimulationConfig;
use crate::metrics::StepMetrics;
use crate::step::{run_callbacks, step, Outputs, StepError};

// Compile-time assertion: Simulation can be moved to a worker thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulation>();
    }
};

/// A model plus everything that runs around its steps.
///
/// # Example
///
/// ```no_run
/// use shoal_core::Trigger;
/// use shoal_diagnostics::NaNChecker;
/// use shoal_engine::{Simulation, SimulationConfig};
/// use shoal_model::{Model, ModelConfig};
/// # fn demo(config: ModelConfig) -> Result<(), shoal_engine::StepError> {
/// let model = Model::new(config)?;
/// let mut sim = Simulation::new(model, SimulationConfig::iterations(60.0, 1000))?;
/// sim.diagnostics_mut()
///     .push(NaNChecker::new(["u", "T"], Trigger::iterations(100).unwrap()));
/// sim.run()?;
/// # Ok(())
/// # }
/// ```
pub struct Simulation {
    model: Model,
    diagnostics: Diagnostics,
    outputs: Outputs,
    config: SimulationConfig,
    next_mode: StepMode,
    initialized: bool,
    last_metrics: StepMetrics,
}

impl Simulation {
    /// Wrap `model` with empty diagnostics and outputs.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Config`] if `config` fails validation.
    pub fn new(model: Model, config: SimulationConfig) -> Result<Self, StepError> {
        config.validate()?;
        Ok(Self {
            model,
            diagnostics: Diagnostics::new(),
            outputs: Outputs::new(),
            config,
            next_mode: StepMode::Auto,
            initialized: false,
            last_metrics: StepMetrics::default(),
        })
    }

    /// The model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mutable access to the model, e.g. to set initial conditions.
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// Consume the simulation and return the model.
    pub fn into_model(self) -> Model {
        self.model
    }

    /// Current clock.
    pub fn clock(&self) -> Clock {
        self.model.clock()
    }

    /// Registered diagnostics.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Register, replace or look up diagnostics.
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Registered output writers.
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// Register, replace or look up output writers.
    pub fn outputs_mut(&mut self) -> &mut Outputs {
        &mut self.outputs
    }

    /// Run configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replace the run configuration, e.g. to extend `stop_iteration`
    /// before calling [`run`](Self::run) again.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), StepError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Metrics from the most recent step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Restore the newest checkpoint written under `dir` with `prefix`.
    ///
    /// The restored model keeps this simulation's reduction backend,
    /// every time-interval trigger is re-anchored to the restored clock,
    /// and the next step uses the stored tendency history (or a forward
    /// Euler step when the checkpoint is at iteration 0). Returns the
    /// restored iteration, or `None` if no checkpoint exists (the model
    /// is left untouched).
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Checkpoint`] if the file is unreadable or
    /// was written on a different grid.
    pub fn pickup(&mut self, dir: impl AsRef<Path>, prefix: &str) -> Result<Option<u64>, StepError> {
        self.pickup_with_extension(dir, prefix, shoal_output::DEFAULT_EXTENSION)
    }

    /// Like [`pickup`](Self::pickup) with a custom file extension.
    pub fn pickup_with_extension(
        &mut self,
        dir: impl AsRef<Path>,
        prefix: &str,
        extension: &str,
    ) -> Result<Option<u64>, StepError> {
        let Some((iteration, path)) = latest_checkpoint(dir, prefix, extension)? else {
            log::info!("no checkpoint with prefix '{prefix}' found; starting fresh");
            return Ok(None);
        };
        let restored = Checkpointer::restore_with_backend(&path, self.model.backend())?;
        if restored.grid() != self.model.grid() {
            return Err(CheckpointError::InvalidRecord {
                detail: format!(
                    "{} was written on a different grid than the running model",
                    path.display()
                ),
            }
            .into());
        }
        self.model = restored;
        self.reset_triggers();
        // A checkpoint taken at iteration 0 holds no tendency history.
        self.next_mode = if iteration == 0 {
            StepMode::Auto
        } else {
            StepMode::Multistep
        };
        self.initialized = true;
        Ok(Some(iteration))
    }

    /// Step until the stop criterion is met. Returns the number of steps
    /// taken.
    ///
    /// On a fresh model (iteration 0) every scheduled callback first runs
    /// once against the initial state. Calling `run` again after
    /// extending the stop criterion continues where the last run ended.
    ///
    /// # Errors
    ///
    /// Stops at the first [`StepError`]. The model keeps whatever state
    /// it reached.
    pub fn run(&mut self) -> Result<u64, StepError> {
        if !self.initialized {
            if self.model.clock().iteration == 0 {
                self.last_metrics =
                    run_callbacks(&self.model, &mut self.diagnostics, &mut self.outputs)?;
            }
            self.initialized = true;
        }

        let mut steps = 0;
        loop {
            let clock = self.model.clock();
            if self.config.stop_reached(clock.iteration, clock.time) {
                break;
            }
            self.last_metrics = step(
                &mut self.model,
                self.config.dt,
                self.next_mode,
                &mut self.diagnostics,
                &mut self.outputs,
            )?;
            self.next_mode = StepMode::Auto;
            steps += 1;
        }
        log::info!("run stopped at {} after {steps} steps", self.model.clock());
        Ok(steps)
    }

    /// Like [`run`](Self::run), but log any error and exit the process
    /// with status 1.
    pub fn run_or_exit(&mut self) -> u64 {
        match self.run() {
            Ok(steps) => steps,
            Err(e) => {
                log::error!("simulation aborted at {}: {e}", self.model.clock());
                std::process::exit(1);
            }
        }
    }

    fn reset_triggers(&mut self) {
        let clock = self.model.clock();
        self.diagnostics.reset_triggers(&clock);
        for writer in self.outputs.iter_mut() {
            writer.trigger_mut().reset_to(&clock);
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("clock", &self.model.clock())
            .field("diagnostics", &self.diagnostics.len())
            .field(
                "outputs",
                &self
                    .outputs
                    .iter()
                    .map(OutputWriter::kind)
                    .collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_test_utils::fixtures::spun_up_model;

    #[test]
    fn invalid_config_rejected() {
        let result = Simulation::new(spun_up_model(0, 0.01), SimulationConfig::iterations(0.0, 3));
        assert!(matches!(result, Err(StepError::Config(_))));
    }

    #[test]
    fn run_stops_at_iteration() {
        let mut sim =
            Simulation::new(spun_up_model(0, 0.01), SimulationConfig::iterations(0.01, 7)).unwrap();
        assert_eq!(sim.run().unwrap(), 7);
        assert_eq!(sim.clock().iteration, 7);
        assert_eq!(sim.run().unwrap(), 0);
    }

    #[test]
    fn run_stops_at_time() {
        let mut sim =
            Simulation::new(spun_up_model(0, 0.1), SimulationConfig::until(0.1, 1.0)).unwrap();
        assert_eq!(sim.run().unwrap(), 10);
    }

    #[test]
    fn extended_run_continues() {
        let mut sim =
            Simulation::new(spun_up_model(0, 0.01), SimulationConfig::iterations(0.01, 3)).unwrap();
        sim.run().unwrap();
        sim.set_config(SimulationConfig::iterations(0.01, 5)).unwrap();
        assert_eq!(sim.run().unwrap(), 2);
        assert_eq!(sim.clock().iteration, 5);
    }

    #[test]
    fn pickup_without_checkpoints_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut sim =
            Simulation::new(spun_up_model(2, 0.01), SimulationConfig::iterations(0.01, 5)).unwrap();
        assert_eq!(sim.pickup(dir.path(), "checkpoint").unwrap(), None);
        assert_eq!(sim.clock().iteration, 2);
    }
}
