//! Run configuration, validation, and error types.
//!
//! [`SimulationConfig`] is the input to
//! [`Simulation::new`](crate::Simulation::new).
//! [`validate()`](SimulationConfig::validate) checks it before anything
//! is stepped, so a misconfigured run fails without touching the model
//! or writing a file.

use std::error::Error;
use std::fmt;

/// Fraction of `dt` by which model time may fall short of `stop_time`
/// and still count as having reached it.
pub const STOP_TIME_SLACK: f64 = 1e-6;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SimulationConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `dt` is NaN, infinite, zero, or negative.
    InvalidTimeStep {
        /// The invalid value.
        value: f64,
    },
    /// `stop_time` is NaN, infinite, or negative.
    InvalidStopTime {
        /// The invalid value.
        value: f64,
    },
    /// Neither `stop_iteration` nor `stop_time` is set.
    NoStopCriterion,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimeStep { value } => {
                write!(f, "dt must be finite and positive, got {value}")
            }
            Self::InvalidStopTime { value } => {
                write!(f, "stop_time must be finite and non-negative, got {value}")
            }
            Self::NoStopCriterion => {
                write!(f, "set stop_iteration or stop_time, or the run never ends")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SimulationConfig ───────────────────────────────────────────────

/// Time step and stop criteria for [`Simulation::run`](crate::Simulation::run).
///
/// The run stops as soon as either criterion is met.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Model time step, in seconds.
    pub dt: f64,
    /// Stop once the clock reaches this iteration.
    pub stop_iteration: Option<u64>,
    /// Stop once model time reaches this value, in seconds.
    pub stop_time: Option<f64>,
}

impl SimulationConfig {
    /// Step with `dt` until `stop_iteration`.
    pub fn iterations(dt: f64, stop_iteration: u64) -> Self {
        Self {
            dt,
            stop_iteration: Some(stop_iteration),
            stop_time: None,
        }
    }

    /// Step with `dt` until model time reaches `stop_time`.
    pub fn until(dt: f64, stop_time: f64) -> Self {
        Self {
            dt,
            stop_iteration: None,
            stop_time: Some(stop_time),
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep { value: self.dt });
        }
        if let Some(t) = self.stop_time {
            if !t.is_finite() || t < 0.0 {
                return Err(ConfigError::InvalidStopTime { value: t });
            }
        }
        if self.stop_iteration.is_none() && self.stop_time.is_none() {
            return Err(ConfigError::NoStopCriterion);
        }
        Ok(())
    }

    /// Returns `true` if a run at `(iteration, time)` should stop.
    pub fn stop_reached(&self, iteration: u64, time: f64) -> bool {
        self.stop_iteration.is_some_and(|n| iteration >= n)
            || self
                .stop_time
                .is_some_and(|t| time >= t - STOP_TIME_SLACK * self.dt)
    }
}
