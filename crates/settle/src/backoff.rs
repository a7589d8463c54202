// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::min;
use std::time::Duration;

use crate::rnd::Rnd;

/// The factor used to determine the range of jitter applied to delays.
const JITTER_FACTOR: f64 = 0.5;

/// How the delay between two attempts grows.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum Backoff {
    /// Each delay is the previous one plus a fixed `increment`.
    ///
    /// With an initial delay of `3s` and an increment of `3s` the delays are
    /// `3s, 6s, 9s, ...` up to the maximum delay.
    Incremental {
        /// Amount added for every further attempt.
        increment: Duration,
    },

    /// Each delay is the previous one multiplied by `multiplier`.
    ///
    /// Multipliers below `1.0`, `NaN` and infinities are treated as `1.0`.
    Exponential {
        /// Growth factor between two consecutive delays.
        multiplier: f64,
    },
}

impl Backoff {
    /// Incremental backoff that adds `increment` for every attempt.
    #[must_use]
    pub fn incremental(increment: Duration) -> Self {
        Self::Incremental { increment }
    }

    /// Exponential backoff that multiplies the delay by `multiplier` for every attempt.
    #[must_use]
    pub fn exponential(multiplier: f64) -> Self {
        Self::Exponential { multiplier }
    }
}

/// Computes the wait before each retry of a remote call.
///
/// The schedule is a pure function of the attempt index. Index `0` is the delay before
/// the second attempt, index `1` the delay before the third one, and so on. Every
/// delay is capped at the maximum delay, and growth that overflows saturates to it.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use settle::{Backoff, BackoffScheduler};
///
/// let scheduler = BackoffScheduler::new(
///     Duration::from_secs(3),
///     Backoff::incremental(Duration::from_secs(3)),
///     Duration::from_secs(10),
/// );
///
/// let delays: Vec<_> = scheduler.delays().take(5).collect();
/// assert_eq!(
///     delays,
///     [3, 6, 9, 10, 10].map(Duration::from_secs)
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffScheduler {
    initial_delay: Duration,
    backoff: Backoff,
    max_delay: Duration,
}

impl BackoffScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new(initial_delay: Duration, backoff: Backoff, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            backoff,
            max_delay,
        }
    }

    /// Returns the delay to wait after the attempt with the given zero-based index failed.
    #[must_use]
    pub fn next_delay(&self, attempt_index: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Incremental { increment } => self
                .initial_delay
                .saturating_add(increment.saturating_mul(attempt_index)),
            Backoff::Exponential { multiplier } => {
                let factor = normalize_multiplier(multiplier).powi(i32::try_from(attempt_index).unwrap_or(i32::MAX));
                secs_to_duration_saturating(self.initial_delay.as_secs_f64() * factor)
            }
        };

        min(delay, self.max_delay)
    }

    /// Returns an endless iterator over the successive delays, starting at index `0`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..=u32::MAX).map(|index| self.next_delay(index)).chain(std::iter::repeat(self.max_delay))
    }

    /// The delay before the second attempt.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// The growth strategy.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// The cap applied to every delay.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

fn normalize_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier >= 1.0 { multiplier } else { 1.0 }
}

/// Adds a symmetric, uniform jitter around the given delay.
///
/// With `JITTER_FACTOR = 0.5`, the result lies in `[0.75*delay, 1.25*delay]`.
pub(crate) fn apply_jitter(delay: Duration, rnd: &Rnd) -> Duration {
    let ms = delay.as_secs_f64() * 1000.0;
    let offset = (ms * JITTER_FACTOR) / 2.0;
    let random_delay = (ms * JITTER_FACTOR).mul_add(rnd.next_f64(), -offset);

    secs_to_duration_saturating((ms + random_delay) / 1000.0)
}

pub(crate) fn secs_to_duration_saturating(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }

    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn incremental(initial: u64, increment: u64, max: u64) -> BackoffScheduler {
        BackoffScheduler::new(
            Duration::from_secs(initial),
            Backoff::incremental(Duration::from_secs(increment)),
            Duration::from_secs(max),
        )
    }

    #[test]
    fn incremental_grows_linearly() {
        let scheduler = incremental(3, 3, 30);

        assert_eq!(scheduler.next_delay(0), Duration::from_secs(3));
        assert_eq!(scheduler.next_delay(1), Duration::from_secs(6));
        assert_eq!(scheduler.next_delay(4), Duration::from_secs(15));
        assert_eq!(scheduler.next_delay(9), Duration::from_secs(30));
        assert_eq!(scheduler.next_delay(10), Duration::from_secs(30));
    }

    #[rstest]
    #[case(0, 0, 10)]
    #[case(3, 3, 30)]
    #[case(1, 7, 20)]
    #[case(50, 1, 20)]
    fn incremental_is_monotonic_and_capped(#[case] initial: u64, #[case] increment: u64, #[case] max: u64) {
        let scheduler = incremental(initial, increment, max);
        let max = Duration::from_secs(max);

        for index in 0..500 {
            let current = scheduler.next_delay(index);
            assert!(current <= scheduler.next_delay(index + 1), "delay shrank after index {index}");
            assert!(current <= max, "delay {current:?} exceeded {max:?}");
        }
    }

    #[test]
    fn incremental_saturates_on_overflow() {
        let scheduler = BackoffScheduler::new(Duration::from_secs(1), Backoff::incremental(Duration::MAX), Duration::from_secs(60));

        assert_eq!(scheduler.next_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn exponential_doubles() {
        let scheduler = BackoffScheduler::new(Duration::from_secs(1), Backoff::exponential(2.0), Duration::from_secs(60));

        let delays: Vec<_> = scheduler.delays().take(8).collect();

        assert_eq!(delays, [1, 2, 4, 8, 16, 32, 60, 60].map(Duration::from_secs));
    }

    #[rstest]
    #[case::shrinking(0.5)]
    #[case::negative(-3.0)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn exponential_clamps_multiplier(#[case] multiplier: f64) {
        let scheduler = BackoffScheduler::new(Duration::from_secs(2), Backoff::exponential(multiplier), Duration::from_secs(60));

        assert_eq!(scheduler.next_delay(0), Duration::from_secs(2));
        assert_eq!(scheduler.next_delay(10), Duration::from_secs(2));
    }

    #[test]
    fn exponential_saturates_on_overflow() {
        let scheduler = BackoffScheduler::new(Duration::from_secs(1), Backoff::exponential(10.0), Duration::from_secs(30));

        assert_eq!(scheduler.next_delay(1_000), Duration::from_secs(30));
        assert_eq!(scheduler.next_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn initial_delay_above_max_is_capped() {
        let scheduler = incremental(45, 3, 30);

        assert_eq!(scheduler.next_delay(0), Duration::from_secs(30));
    }

    #[test]
    fn accessors() {
        let scheduler = incremental(1, 2, 3);

        assert_eq!(scheduler.initial_delay(), Duration::from_secs(1));
        assert_eq!(scheduler.backoff(), Backoff::incremental(Duration::from_secs(2)));
        assert_eq!(scheduler.max_delay(), Duration::from_secs(3));
    }

    #[rstest]
    #[case(0.0, 750)]
    #[case(0.5, 1000)]
    #[case(1.0, 1250)]
    fn jitter_bounds(#[case] random: f64, #[case] expected_ms: u64) {
        let delay = apply_jitter(Duration::from_secs(1), &Rnd::new_fixed(random));

        assert_eq!(delay.as_millis(), u128::from(expected_ms));
    }

    #[test]
    fn jitter_on_zero_delay() {
        assert_eq!(apply_jitter(Duration::ZERO, &Rnd::new_fixed(0.7)), Duration::ZERO);
    }

    #[test]
    fn secs_to_duration_saturating_edges() {
        assert_eq!(secs_to_duration_saturating(-1.0), Duration::ZERO);
        assert_eq!(secs_to_duration_saturating(f64::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration_saturating(f64::INFINITY), Duration::MAX);
        assert_eq!(secs_to_duration_saturating(1.5), Duration::from_millis(1500));
    }
}
