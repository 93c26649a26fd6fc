//! Trajectory comparison between two model states.
//!
//! Hash-first: identical field bits short-circuit to "no divergence".
//! Otherwise every field is compared cell by cell against an absolute
//! tolerance.

use shoal_field::StateView;

use crate::hash::fields_hash;

/// How one field differs between the two states.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDivergence {
    /// Field accessor name.
    pub field: String,
    /// Storage index of the first cell outside tolerance.
    pub first_cell: usize,
    /// Reference value at `first_cell` (NaN if the field is missing).
    pub reference: f64,
    /// Candidate value at `first_cell` (NaN if the field is missing).
    pub candidate: f64,
    /// Number of cells outside tolerance.
    pub cells: usize,
    /// Largest absolute difference over the field.
    pub max_difference: f64,
}

/// Everything found to differ between two states.
#[derive(Clone, Debug, PartialEq)]
pub struct DivergenceReport {
    /// Reference iteration.
    pub iteration: u64,
    /// `true` if the clocks disagree.
    pub clock_mismatch: bool,
    /// Per-field divergences, in the reference's field order.
    pub divergences: Vec<FieldDivergence>,
}

impl DivergenceReport {
    /// Largest absolute difference across all fields.
    pub fn max_difference(&self) -> f64 {
        self.divergences
            .iter()
            .map(|d| d.max_difference)
            .fold(0.0, f64::max)
    }
}

/// Compare every field of `reference` against `candidate`.
///
/// Returns `None` if the clocks agree and every cell differs by at most
/// `epsilon`. Fields present only in `candidate` are ignored. A
/// non-finite value only matches a bit-identical one.
pub fn compare_states(
    reference: &dyn StateView,
    candidate: &dyn StateView,
    epsilon: f64,
) -> Option<DivergenceReport> {
    let (rc, cc) = (reference.clock(), candidate.clock());
    let clock_mismatch = rc.iteration != cc.iteration || (rc.time - cc.time).abs() > epsilon;
    let names = reference.field_names();

    let hashes_agree = names.iter().all(|n| candidate.field(n).is_some()) && {
        let hash = |s: &dyn StateView| {
            fields_hash(names.iter().filter_map(|&n| s.field(n).map(|f| (n, f))))
        };
        hash(reference) == hash(candidate)
    };
    if hashes_agree && !clock_mismatch {
        return None;
    }

    let mut divergences = Vec::new();
    for &name in &names {
        let Some(a) = reference.field(name) else {
            continue;
        };
        let Some(b) = candidate.field(name) else {
            divergences.push(FieldDivergence {
                field: name.to_string(),
                first_cell: 0,
                reference: f64::NAN,
                candidate: f64::NAN,
                cells: a.data().len(),
                max_difference: f64::INFINITY,
            });
            continue;
        };
        if let Some(d) = compare_data(name, a.data(), b.data(), epsilon) {
            divergences.push(d);
        }
    }

    if divergences.is_empty() && !clock_mismatch {
        return None;
    }
    Some(DivergenceReport {
        iteration: rc.iteration,
        clock_mismatch,
        divergences,
    })
}

fn compare_data(name: &str, a: &[f64], b: &[f64], epsilon: f64) -> Option<FieldDivergence> {
    let mut first: Option<(usize, f64, f64)> = None;
    let mut cells = 0;
    let mut max_difference = 0.0f64;
    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        let diff = if x.to_bits() == y.to_bits() {
            0.0
        } else if x.is_finite() && y.is_finite() {
            (x - y).abs()
        } else {
            f64::INFINITY
        };
        if diff > epsilon {
            cells += 1;
            max_difference = max_difference.max(diff);
            first.get_or_insert((i, x, y));
        }
    }
    if a.len() != b.len() {
        let n = a.len().min(b.len());
        cells += a.len().max(b.len()) - n;
        max_difference = f64::INFINITY;
        first.get_or_insert((n, f64::NAN, f64::NAN));
    }
    first.map(|(first_cell, reference, candidate)| FieldDivergence {
        field: name.to_string(),
        first_cell,
        reference,
        candidate,
        cells,
        max_difference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_test_utils::fixtures::velocity_state;

    #[test]
    fn identical_states_agree() {
        let a = velocity_state(1.0);
        assert!(compare_states(&a, &a.clone(), 0.0).is_none());
    }

    #[test]
    fn tolerance_is_respected() {
        let a = velocity_state(1.0);
        let mut b = a.clone();
        b.field_mut("v").unwrap().set(2, 2, 2, 1e-12);
        assert!(compare_states(&a, &b, 1e-10).is_none());

        let report = compare_states(&a, &b, 1e-14).unwrap();
        assert!(!report.clock_mismatch);
        assert_eq!(report.divergences.len(), 1);
        assert_eq!(report.divergences[0].field, "v");
        assert_eq!(report.divergences[0].cells, 1);
        assert!((report.max_difference() - 1e-12).abs() < 1e-24);
    }

    #[test]
    fn clock_mismatch_reported() {
        let a = velocity_state(1.0);
        let mut b = a.clone();
        b.tick(0.1);
        let report = compare_states(&a, &b, 1e-6).unwrap();
        assert!(report.clock_mismatch);
        assert!(report.divergences.is_empty());
    }

    #[test]
    fn nan_never_within_tolerance() {
        let a = velocity_state(1.0);
        let mut b = a.clone();
        b.field_mut("u").unwrap().set(0, 0, 0, f64::NAN);
        let report = compare_states(&a, &b, 1e6).unwrap();
        assert_eq!(report.divergences[0].max_difference, f64::INFINITY);
    }
}
