//! The model clock: a monotonic `(iteration, time)` pair.

use std::fmt;

/// Iteration count and elapsed model time.
///
/// Owned by the model and advanced exactly once per completed step via
/// [`tick`](Clock::tick). The only way to move a clock backwards is to
/// build a fresh one from a checkpoint with [`restored`](Clock::restored).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Clock {
    /// Number of completed steps.
    pub iteration: u64,
    /// Elapsed model time in seconds.
    pub time: f64,
}

impl Clock {
    /// A clock at iteration 0, time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a clock from checkpointed values.
    pub fn restored(iteration: u64, time: f64) -> Self {
        Self { iteration, time }
    }

    /// Advance by one completed step of length `dt`.
    pub fn tick(&mut self, dt: f64) {
        self.iteration += 1;
        self.time += dt;
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iteration {} (t = {:.6e} s)", self.iteration, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_both_components() {
        let mut clock = Clock::new();
        clock.tick(0.5);
        clock.tick(0.25);
        assert_eq!(clock.iteration, 2);
        assert!((clock.time - 0.75).abs() < 1e-15);
    }

    #[test]
    fn restored_clock_matches_inputs() {
        let clock = Clock::restored(17, 3.5);
        assert_eq!(clock.iteration, 17);
        assert_eq!(clock.time, 3.5);
    }

    #[test]
    fn display_names_iteration() {
        let s = Clock::restored(3, 1.0).to_string();
        assert!(s.starts_with("iteration 3"));
    }
}
