//! Error types for diagnostics.

use std::error::Error;
use std::fmt;

use shoal_field::FieldError;

/// Errors raised while running a diagnostic.
///
/// [`NonFiniteValue`](Self::NonFiniteValue),
/// [`DivergenceAbort`](Self::DivergenceAbort) and
/// [`UncheckableField`](Self::UncheckableField) are fatal: the run must
/// stop. Everything else is recoverable and the runner logs it.
#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticError {
    /// A field required by the diagnostic could not be read.
    Field(FieldError),
    /// A non-finite value was found.
    NonFiniteValue {
        /// Name of the offending field.
        field: String,
        /// Iteration at which it was found.
        iteration: u64,
        /// Model time at which it was found.
        time: f64,
    },
    /// Velocity divergence exceeded the abort threshold.
    DivergenceAbort {
        /// Smallest cell divergence.
        min: f64,
        /// Mean cell divergence.
        mean: f64,
        /// Largest cell divergence.
        max: f64,
        /// Iteration at which the threshold was crossed.
        iteration: u64,
    },
    /// A safety check could not read a field it guards, so the state
    /// cannot be vouched for.
    UncheckableField {
        /// The check that failed to run.
        checker: &'static str,
        /// Why the field could not be read.
        error: FieldError,
    },
    /// A diagnostic was constructed with invalid parameters.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl DiagnosticError {
    /// Returns `true` if the simulation must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NonFiniteValue { .. }
                | Self::DivergenceAbort { .. }
                | Self::UncheckableField { .. }
        )
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(e) => write!(f, "{e}"),
            Self::NonFiniteValue {
                field,
                iteration,
                time,
            } => write!(
                f,
                "non-finite value in field '{field}' at iteration {iteration} (t = {time})"
            ),
            Self::DivergenceAbort {
                min,
                mean,
                max,
                iteration,
            } => write!(
                f,
                "velocity divergence exceeded abort threshold at iteration {iteration}: \
                 min={min:e}, mean={mean:e}, max={max:e}"
            ),
            Self::UncheckableField { checker, error } => {
                write!(f, "{checker} cannot run: {error}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid diagnostic: {reason}"),
        }
    }
}

impl Error for DiagnosticError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(e) => Some(e),
            Self::UncheckableField { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<FieldError> for DiagnosticError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}
