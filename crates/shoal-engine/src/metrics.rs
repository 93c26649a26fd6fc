//! Per-step performance metrics.
//!
//! [`StepMetrics`] captures where the wall-clock time of one step went
//! and how much output it produced.

/// Timing and output metrics collected during a single step.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Time spent integrating the model, in microseconds. Zero for the
    /// callback-only pass at iteration 0.
    pub model_step_us: u64,
    /// Time spent running scheduled diagnostics, in microseconds.
    pub diagnostics_us: u64,
    /// Number of diagnostics that ran.
    pub diagnostics_run: usize,
    /// Per-writer execution times: `(label, microseconds)`, only for
    /// writers that fired.
    pub output_us: Vec<(String, u64)>,
    /// Bytes written by output writers during this step.
    pub bytes_written: u64,
}
