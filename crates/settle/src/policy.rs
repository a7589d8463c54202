// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::min;
use std::time::Duration;

use crate::backoff::apply_jitter;
use crate::constants::{DEFAULT_INCREMENT, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_ELAPSED};
use crate::rnd::Rnd;
use crate::{Backoff, BackoffScheduler, ErrorClass};

/// Limits and backoff used when retrying a single remote call.
///
/// The defaults are a `5 minutes` budget, a first delay of `3s` that grows by `3s` per
/// attempt and a `30s` cap, without jitter. `NotFound` errors are not retried unless
/// [`retry_not_found`][Self::retry_not_found] is enabled.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use settle::{Backoff, RetryPolicy};
///
/// let policy = RetryPolicy::new()
///     .max_elapsed(Duration::from_secs(60))
///     .initial_delay(Duration::from_secs(1))
///     .backoff(Backoff::exponential(2.0))
///     .max_delay(Duration::from_secs(10))
///     .jitter(true);
///
/// assert_eq!(policy.get_max_elapsed(), Duration::from_secs(60));
/// assert_eq!(policy.scheduler().next_delay(3), Duration::from_secs(8));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_elapsed: Duration,
    scheduler: BackoffScheduler,
    retry_not_found: bool,
    jitter: bool,
    rnd: Rnd,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Creates a policy with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_elapsed: DEFAULT_MAX_ELAPSED,
            scheduler: BackoffScheduler::new(DEFAULT_INITIAL_DELAY, Backoff::incremental(DEFAULT_INCREMENT), DEFAULT_MAX_DELAY),
            retry_not_found: false,
            jitter: false,
            rnd: Rnd::default(),
        }
    }

    /// Sets the total time budget, measured from the first attempt.
    ///
    /// A retry is only scheduled when it would start within this budget. At least one
    /// attempt is always made, even with a zero budget.
    #[must_use]
    pub fn max_elapsed(self, max_elapsed: Duration) -> Self {
        Self { max_elapsed, ..self }
    }

    /// Sets the delay before the second attempt.
    #[must_use]
    pub fn initial_delay(self, initial_delay: Duration) -> Self {
        let scheduler = BackoffScheduler::new(initial_delay, self.scheduler.backoff(), self.scheduler.max_delay());
        Self { scheduler, ..self }
    }

    /// Sets how the delay grows between attempts.
    #[must_use]
    pub fn backoff(self, backoff: Backoff) -> Self {
        let scheduler = BackoffScheduler::new(self.scheduler.initial_delay(), backoff, self.scheduler.max_delay());
        Self { scheduler, ..self }
    }

    /// Sets the cap applied to every delay.
    #[must_use]
    pub fn max_delay(self, max_delay: Duration) -> Self {
        let scheduler = BackoffScheduler::new(self.scheduler.initial_delay(), self.scheduler.backoff(), max_delay);
        Self { scheduler, ..self }
    }

    /// Retries `NotFound` errors like transient ones.
    ///
    /// Useful right after a create call, when the control plane does not list the new
    /// resource yet. Deletion waits ignore this setting for their describe calls.
    #[must_use]
    pub fn retry_not_found(self, enable: bool) -> Self {
        Self {
            retry_not_found: enable,
            ..self
        }
    }

    /// Randomizes every computed delay by +/-25%, still capped at the maximum delay.
    ///
    /// Server supplied `retry_after` hints are used as is.
    #[must_use]
    pub fn jitter(self, enable: bool) -> Self {
        Self { jitter: enable, ..self }
    }

    /// The total time budget.
    #[must_use]
    pub fn get_max_elapsed(&self) -> Duration {
        self.max_elapsed
    }

    /// The backoff schedule.
    #[must_use]
    pub fn scheduler(&self) -> &BackoffScheduler {
        &self.scheduler
    }

    /// Whether `NotFound` errors are retried.
    #[must_use]
    pub fn is_retry_not_found(&self) -> bool {
        self.retry_not_found
    }

    /// Whether jitter is applied.
    #[must_use]
    pub fn is_jitter(&self) -> bool {
        self.jitter
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn rnd(self, rnd: Rnd) -> Self {
        Self { rnd, ..self }
    }

    pub(crate) fn budget_at_most(&self, budget: Duration) -> Self {
        Self {
            max_elapsed: min(self.max_elapsed, budget),
            ..self.clone()
        }
    }

    pub(crate) fn should_retry(&self, class: ErrorClass) -> bool {
        class.is_retryable() || (self.retry_not_found && class == ErrorClass::NotFound)
    }

    pub(crate) fn retry_delay(&self, retry_index: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint;
        }

        let delay = self.scheduler.next_delay(retry_index);

        if self.jitter {
            min(apply_jitter(delay, &self.rnd), self.scheduler.max_delay())
        } else {
            delay
        }
    }
}
