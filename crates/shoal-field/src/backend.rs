//! Execution backends for order-independent reductions.
//!
//! Every reduction a diagnostic performs (averages, extrema, divergence
//! statistics, NaN scans) is expressed as a map over cell indices
//! followed by one of the [`Reduction`] operators or an `any` test. The
//! [`Backend`] picks how that map is executed: a plain loop or a rayon
//! data-parallel split. Results are independent of the split for
//! `Min`/`Max`/`any` and agree to round-off for `Sum`.

use rayon::prelude::*;

/// An associative, commutative reduction operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Sum of all values.
    Sum,
    /// Smallest value; NaNs are ignored.
    Min,
    /// Largest value; NaNs are ignored.
    Max,
}

impl Reduction {
    /// Neutral element of the operator.
    pub fn identity(self) -> f64 {
        match self {
            Self::Sum => 0.0,
            Self::Min => f64::INFINITY,
            Self::Max => f64::NEG_INFINITY,
        }
    }

    /// Combine two partial results.
    #[inline]
    pub fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Sum => a + b,
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

/// How cell-wise maps and reductions are executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Sequential loop on the calling thread.
    #[default]
    Serial,
    /// Data-parallel execution on the rayon global pool.
    Parallel,
}

impl Backend {
    /// Short name for logs and archive metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Parallel => "parallel",
        }
    }

    /// Parse a name produced by [`name`](Backend::name).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "serial" => Some(Self::Serial),
            "parallel" => Some(Self::Parallel),
            _ => None,
        }
    }

    /// Reduce `f(0), f(1), ..., f(n - 1)` with `op`.
    ///
    /// Returns `op.identity()` when `n == 0`.
    pub fn map_reduce<F>(&self, n: usize, op: Reduction, f: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync + Send,
    {
        match self {
            Self::Serial => (0..n).map(f).fold(op.identity(), |a, b| op.combine(a, b)),
            Self::Parallel => (0..n)
                .into_par_iter()
                .map(f)
                .reduce(|| op.identity(), |a, b| op.combine(a, b)),
        }
    }

    /// Returns `true` if `pred(i)` holds for any `i` in `0..n`.
    pub fn any<F>(&self, n: usize, pred: F) -> bool
    where
        F: Fn(usize) -> bool + Sync + Send,
    {
        match self {
            Self::Serial => (0..n).any(pred),
            Self::Parallel => (0..n).into_par_iter().any(pred),
        }
    }

    /// Sum of a slice.
    pub fn sum(&self, xs: &[f64]) -> f64 {
        self.map_reduce(xs.len(), Reduction::Sum, |i| xs[i])
    }

    /// Minimum of a slice, ignoring NaNs.
    pub fn min(&self, xs: &[f64]) -> f64 {
        self.map_reduce(xs.len(), Reduction::Min, |i| xs[i])
    }

    /// Maximum of a slice, ignoring NaNs.
    pub fn max(&self, xs: &[f64]) -> f64 {
        self.map_reduce(xs.len(), Reduction::Max, |i| xs[i])
    }

    /// Returns `true` if any element is NaN or infinite.
    pub fn any_non_finite(&self, xs: &[f64]) -> bool {
        self.any(xs.len(), |i| !xs[i].is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_reductions_return_identity() {
        for backend in [Backend::Serial, Backend::Parallel] {
            assert_eq!(backend.sum(&[]), 0.0);
            assert_eq!(backend.min(&[]), f64::INFINITY);
            assert_eq!(backend.max(&[]), f64::NEG_INFINITY);
            assert!(!backend.any_non_finite(&[]));
        }
    }

    #[test]
    fn detects_nan_and_infinity() {
        for backend in [Backend::Serial, Backend::Parallel] {
            assert!(backend.any_non_finite(&[1.0, f64::NAN]));
            assert!(backend.any_non_finite(&[f64::NEG_INFINITY, 1.0]));
            assert!(!backend.any_non_finite(&[1.0, -2.0]));
        }
    }

    #[test]
    fn names_round_trip() {
        for backend in [Backend::Serial, Backend::Parallel] {
            assert_eq!(Backend::from_name(backend.name()), Some(backend));
        }
        assert_eq!(Backend::from_name("gpu"), None);
    }

    proptest! {
        #[test]
        fn backends_agree(xs in prop::collection::vec(-1e6f64..1e6, 0..2000)) {
            let s = Backend::Serial;
            let p = Backend::Parallel;
            prop_assert_eq!(s.min(&xs), p.min(&xs));
            prop_assert_eq!(s.max(&xs), p.max(&xs));
            let scale = xs.iter().map(|x| x.abs()).sum::<f64>().max(1.0);
            prop_assert!((s.sum(&xs) - p.sum(&xs)).abs() <= 1e-12 * scale);
        }
    }
}
