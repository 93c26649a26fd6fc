//! Schedules deciding whether a callback fires on a given step.
//!
//! Every writer and diagnostic owns exactly one [`Trigger`]. Iteration
//! triggers are pure functions of the clock; time triggers keep a single
//! piece of bookkeeping, the model time at which they last fired.

use crate::clock::Clock;
use crate::error::ScheduleError;

/// Relative slack applied to time-interval comparisons so that
/// accumulated round-off in `time += dt` cannot skip a firing.
const INTERVAL_SLACK: f64 = 1e-10;

/// When a writer or diagnostic runs.
///
/// The two kinds are not combinable: a callback fires either on an
/// iteration period or on an elapsed-time interval.
///
/// # Examples
///
/// ```
/// use shoal_core::{Clock, Trigger};
///
/// let mut every_ten = Trigger::iterations(10).unwrap();
/// assert!(every_ten.should_fire(&Clock::restored(20, 2.0)));
/// assert!(!every_ten.should_fire(&Clock::restored(21, 2.1)));
///
/// assert!(Trigger::iterations(0).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Trigger {
    /// Fires when `iteration % period == 0`.
    IterationInterval {
        /// Number of iterations between firings. Always at least 1.
        period: u64,
    },
    /// Fires once `time - last_fired >= interval`.
    TimeInterval {
        /// Model time between firings, in seconds.
        interval: f64,
        /// Model time at which this trigger last fired.
        last_fired: f64,
    },
}

impl Trigger {
    /// Fire every `period` iterations.
    pub fn iterations(period: u64) -> Result<Self, ScheduleError> {
        if period == 0 {
            return Err(ScheduleError::ZeroPeriod);
        }
        Ok(Self::IterationInterval { period })
    }

    /// Fire every `interval` seconds of model time, counted from time 0.
    pub fn time_interval(interval: f64) -> Result<Self, ScheduleError> {
        Self::time_interval_from(interval, 0.0)
    }

    /// Fire every `interval` seconds of model time, counted from `start`.
    pub fn time_interval_from(interval: f64, start: f64) -> Result<Self, ScheduleError> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ScheduleError::InvalidInterval { value: interval });
        }
        Ok(Self::TimeInterval {
            interval,
            last_fired: start,
        })
    }

    /// Decide whether the callback owning this trigger runs at `clock`.
    ///
    /// Time-interval triggers record `clock.time` when they fire, so a
    /// second check within the same step returns `false`.
    pub fn should_fire(&mut self, clock: &Clock) -> bool {
        match self {
            Self::IterationInterval { period } => clock.iteration % *period == 0,
            Self::TimeInterval {
                interval,
                last_fired,
            } => {
                let elapsed = clock.time - *last_fired;
                if elapsed >= *interval * (1.0 - INTERVAL_SLACK) {
                    *last_fired = clock.time;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Re-anchor interval bookkeeping to `clock`, e.g. after restoring a
    /// checkpoint. Iteration triggers are unaffected.
    pub fn reset_to(&mut self, clock: &Clock) {
        if let Self::TimeInterval { last_fired, .. } = self {
            *last_fired = clock.time;
        }
    }

    /// The iteration period, if this is an iteration trigger.
    pub fn period(&self) -> Option<u64> {
        match self {
            Self::IterationInterval { period } => Some(*period),
            Self::TimeInterval { .. } => None,
        }
    }
}

/// Free-function form of [`Trigger::should_fire`].
pub fn should_fire(clock: &Clock, trigger: &mut Trigger) -> bool {
    trigger.should_fire(clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_period_rejected() {
        assert_eq!(Trigger::iterations(0), Err(ScheduleError::ZeroPeriod));
    }

    #[test]
    fn bad_intervals_rejected() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Trigger::time_interval(value),
                Err(ScheduleError::InvalidInterval { .. })
            ));
        }
    }

    #[test]
    fn iteration_trigger_fires_on_multiples() {
        let mut trigger = Trigger::iterations(3).unwrap();
        let fired: Vec<u64> = (0..10)
            .filter(|&i| trigger.should_fire(&Clock::restored(i, i as f64)))
            .collect();
        assert_eq!(fired, vec![0, 3, 6, 9]);
    }

    #[test]
    fn iteration_trigger_is_pure() {
        let mut trigger = Trigger::iterations(2).unwrap();
        let clock = Clock::restored(4, 0.4);
        assert!(trigger.should_fire(&clock));
        assert!(trigger.should_fire(&clock));
    }

    #[test]
    fn time_trigger_fires_after_interval() {
        let mut trigger = Trigger::time_interval(1.0).unwrap();
        let mut clock = Clock::new();
        let mut fired = Vec::new();
        for _ in 0..25 {
            clock.tick(0.1);
            if trigger.should_fire(&clock) {
                fired.push(clock.iteration);
            }
        }
        assert_eq!(fired, vec![10, 20]);
    }

    #[test]
    fn time_trigger_does_not_double_fire() {
        let mut trigger = Trigger::time_interval(0.5).unwrap();
        let clock = Clock::restored(5, 0.5);
        assert!(trigger.should_fire(&clock));
        assert!(!trigger.should_fire(&clock));
    }

    #[test]
    fn reset_reanchors_interval() {
        let mut trigger = Trigger::time_interval(1.0).unwrap();
        trigger.reset_to(&Clock::restored(100, 10.0));
        assert!(!trigger.should_fire(&Clock::restored(101, 10.5)));
        assert!(trigger.should_fire(&Clock::restored(102, 11.0)));
    }

    proptest! {
        #[test]
        fn iteration_trigger_matches_modulo(period in 1u64..50, iteration in 0u64..10_000) {
            let mut trigger = Trigger::iterations(period).unwrap();
            let clock = Clock::restored(iteration, 0.0);
            prop_assert_eq!(trigger.should_fire(&clock), iteration % period == 0);
        }

        #[test]
        fn time_trigger_fire_count_bounded(interval in 0.05f64..2.0, steps in 1usize..400) {
            let dt = 0.01;
            let mut trigger = Trigger::time_interval(interval).unwrap();
            let mut clock = Clock::new();
            let mut count = 0usize;
            for _ in 0..steps {
                clock.tick(dt);
                if trigger.should_fire(&clock) {
                    count += 1;
                }
            }
            let upper = (clock.time / interval).floor() as usize + 1;
            prop_assert!(count <= upper);
        }
    }
}
