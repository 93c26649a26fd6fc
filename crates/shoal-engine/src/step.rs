//! One model step followed by the scheduled callbacks.
//!
//! Callbacks run on the calling thread after the model has advanced:
//! diagnostics first, then output writers, each in registration order.
//! Every callback sees the post-step clock.

use std::error::Error;
use std::fmt;
use std::time::Instant;

use shoal_core::Registry;
use shoal_diagnostics::{DiagnosticError, Diagnostics};
use shoal_field::StateView;
use shoal_model::{Model, ModelError, StepMode};
use shoal_output::{CheckpointError, OutputError, OutputWriter};

use crate::config::ConfigError;
use crate::metrics::StepMetrics;

/// Output writers in registration order, optionally keyed.
pub type Outputs = Registry<OutputWriter>;

// ── StepError ──────────────────────────────────────────────────────

/// Errors surfaced by [`step`] and [`Simulation`](crate::Simulation).
#[derive(Debug)]
pub enum StepError {
    /// A fatal diagnostic fired. The run must stop.
    Fatal(DiagnosticError),
    /// The model rejected the step.
    Model(ModelError),
    /// An output writer failed. Not retried.
    Output(OutputError),
    /// A checkpoint could not be restored.
    Checkpoint(CheckpointError),
    /// The run configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(e) => write!(f, "fatal diagnostic: {e}"),
            Self::Model(e) => write!(f, "model: {e}"),
            Self::Output(e) => write!(f, "output: {e}"),
            Self::Checkpoint(e) => write!(f, "checkpoint: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fatal(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Output(e) => Some(e),
            Self::Checkpoint(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<DiagnosticError> for StepError {
    fn from(e: DiagnosticError) -> Self {
        Self::Fatal(e)
    }
}

impl From<ModelError> for StepError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<OutputError> for StepError {
    fn from(e: OutputError) -> Self {
        Self::Output(e)
    }
}

impl From<CheckpointError> for StepError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}

impl From<ConfigError> for StepError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ── step ───────────────────────────────────────────────────────────

/// Advance `model` by `dt`, then run every scheduled callback.
///
/// # Errors
///
/// Returns [`StepError::Model`] if the step is rejected (the model is
/// unchanged and no callback runs), [`StepError::Fatal`] if a fatal
/// diagnostic fires (no writer runs), or [`StepError::Output`] on the
/// first writer failure.
pub fn step(
    model: &mut Model,
    dt: f64,
    mode: StepMode,
    diagnostics: &mut Diagnostics,
    outputs: &mut Outputs,
) -> Result<StepMetrics, StepError> {
    let start = Instant::now();
    model.step(dt, mode)?;
    let model_step_us = start.elapsed().as_micros() as u64;

    let mut metrics = run_callbacks(model, diagnostics, outputs)?;
    metrics.model_step_us = model_step_us;
    metrics.total_us = start.elapsed().as_micros() as u64;
    log::debug!(
        "step to {} took {} us ({} us in the model)",
        model.clock(),
        metrics.total_us,
        metrics.model_step_us
    );
    Ok(metrics)
}

/// Run scheduled diagnostics, then scheduled writers, against `model`'s
/// current state without stepping it.
///
/// Recoverable diagnostic errors are logged and skipped.
pub fn run_callbacks(
    model: &Model,
    diagnostics: &mut Diagnostics,
    outputs: &mut Outputs,
) -> Result<StepMetrics, StepError> {
    let start = Instant::now();
    let mut metrics = StepMetrics::default();

    let diag_start = Instant::now();
    metrics.diagnostics_run = diagnostics.run_scheduled(model).inspect_err(|e| {
        log::error!("stopping at {}: {e}", model.clock());
    })?;
    metrics.diagnostics_us = diag_start.elapsed().as_micros() as u64;

    for index in 0..outputs.len() {
        let label = outputs.key_at(index).map(str::to_string);
        let Some(writer) = outputs.get_mut(index) else {
            continue;
        };
        let out_start = Instant::now();
        if let Some(bytes) = writer.run_if_scheduled(model)? {
            let label = label.unwrap_or_else(|| format!("{}#{index}", writer.kind()));
            metrics
                .output_us
                .push((label, out_start.elapsed().as_micros() as u64));
            metrics.bytes_written += bytes;
        }
    }

    metrics.total_us = start.elapsed().as_micros() as u64;
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::Trigger;
    use shoal_diagnostics::{AdvectiveCfl, NaNChecker};
    use shoal_output::Checkpointer;
    use shoal_test_utils::fixtures::spun_up_model;

    #[test]
    fn rejected_step_runs_no_callbacks() {
        let mut model = spun_up_model(0, 0.01);
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(AdvectiveCfl::new(0.01, Trigger::iterations(1).unwrap()).unwrap());
        let mut outputs = Outputs::new();
        let err = step(
            &mut model,
            -1.0,
            StepMode::Auto,
            &mut diagnostics,
            &mut outputs,
        )
        .unwrap_err();
        assert!(matches!(err, StepError::Model(_)));
        assert_eq!(model.clock().iteration, 0);
    }

    #[test]
    fn metrics_count_fired_callbacks() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = spun_up_model(0, 0.01);
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(NaNChecker::new(["u", "T"], Trigger::iterations(1).unwrap()));
        diagnostics.push(AdvectiveCfl::new(0.01, Trigger::iterations(2).unwrap()).unwrap());
        let mut outputs = Outputs::new();
        outputs
            .push_keyed(
                "restart",
                Checkpointer::builder(dir.path())
                    .every(2)
                    .build()
                    .unwrap()
                    .into(),
            )
            .unwrap();

        let first = step(
            &mut model,
            0.01,
            StepMode::Auto,
            &mut diagnostics,
            &mut outputs,
        )
        .unwrap();
        assert_eq!(first.diagnostics_run, 1);
        assert!(first.output_us.is_empty());
        assert_eq!(first.bytes_written, 0);

        let second = step(
            &mut model,
            0.01,
            StepMode::Auto,
            &mut diagnostics,
            &mut outputs,
        )
        .unwrap();
        assert_eq!(second.diagnostics_run, 2);
        assert_eq!(second.output_us.len(), 1);
        assert_eq!(second.output_us[0].0, "restart");
        assert!(second.bytes_written > 0);
        assert!(dir.path().join("checkpoint2.shoal").exists());
    }

    #[test]
    fn unkeyed_writers_are_labelled_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let model = spun_up_model(0, 0.01);
        let mut outputs = Outputs::new();
        outputs.push(
            Checkpointer::builder(dir.path())
                .every(1)
                .build()
                .unwrap()
                .into(),
        );
        let metrics = run_callbacks(&model, &mut Diagnostics::new(), &mut outputs).unwrap();
        assert_eq!(metrics.output_us[0].0, "checkpoint#0");
    }
}
