// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deserializable retry and polling settings.

use std::time::Duration;

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::{Backoff, PollSpec, ResourceState, RetryPolicy};

/// An error produced when converting a configuration into a policy or spec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A duration field holds a negative value.
    #[error("'{field}' must not be negative")]
    NegativeDuration {
        /// The name of the offending field.
        field: &'static str,
    },

    /// Both `increment` and `multiplier` are set.
    #[error("'increment' and 'multiplier' are mutually exclusive")]
    ConflictingBackoff,
}

/// Retry settings for remote calls.
///
/// Every field is optional and falls back to the [`RetryPolicy`] default. Durations accept
/// both the friendly (`"5s"`, `"2m 30s"`) and the ISO 8601 (`"PT5S"`) forms.
///
/// # Examples
///
/// ```
/// use settle::RetryConfig;
///
/// let config: RetryConfig = serde_json::from_str(r#"{ "max_elapsed": "2m", "initial_delay": "1s", "multiplier": 2.0 }"#)?;
/// let policy = config.to_policy()?;
///
/// assert_eq!(policy.get_max_elapsed().as_secs(), 120);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Upper bound on the time spent retrying a single call.
    pub max_elapsed: Option<SignedDuration>,
    /// Delay before the second attempt.
    pub initial_delay: Option<SignedDuration>,
    /// Amount added to the delay for every further attempt.
    pub increment: Option<SignedDuration>,
    /// Factor applied to the delay for every further attempt.
    pub multiplier: Option<f64>,
    /// Cap applied to every delay.
    pub max_delay: Option<SignedDuration>,
    /// Retry calls that fail with a not-found error.
    pub retry_not_found: Option<bool>,
    /// Randomize the delays.
    pub jitter: Option<bool>,
}

impl RetryConfig {
    /// Builds a [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a duration is negative or the backoff is ambiguous.
    pub fn to_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let mut policy = RetryPolicy::new();

        if let Some(max_elapsed) = to_duration(self.max_elapsed, "max_elapsed")? {
            policy = policy.max_elapsed(max_elapsed);
        }

        if let Some(initial_delay) = to_duration(self.initial_delay, "initial_delay")? {
            policy = policy.initial_delay(initial_delay);
        }

        match (to_duration(self.increment, "increment")?, self.multiplier) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingBackoff),
            (Some(increment), None) => policy = policy.backoff(Backoff::incremental(increment)),
            (None, Some(multiplier)) => policy = policy.backoff(Backoff::exponential(multiplier)),
            (None, None) => {}
        }

        if let Some(max_delay) = to_duration(self.max_delay, "max_delay")? {
            policy = policy.max_delay(max_delay);
        }

        if let Some(enable) = self.retry_not_found {
            policy = policy.retry_not_found(enable);
        }

        if let Some(enable) = self.jitter {
            policy = policy.jitter(enable);
        }

        Ok(policy)
    }
}

/// Polling settings for one kind of lifecycle transition.
///
/// # Examples
///
/// ```
/// use settle::PollConfig;
///
/// let config: PollConfig = serde_json::from_str(
///     r#"{ "pending": ["Pending"], "target": ["Available"], "timeout": "PT10M", "poll_interval": "10s" }"#,
/// )?;
/// let spec = config.to_spec()?;
///
/// assert_eq!(spec.get_timeout().as_secs(), 600);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    /// States in which the resource is still transitioning.
    pub pending: Vec<String>,
    /// States that settle the wait.
    pub target: Vec<String>,
    /// States that fail the wait.
    pub fail: Vec<String>,
    /// Wait for the resource to disappear.
    pub deletion: bool,
    /// Overall budget.
    pub timeout: Option<SignedDuration>,
    /// Wait between two describe calls.
    pub poll_interval: Option<SignedDuration>,
    /// Floor for the wait between two describe calls.
    pub min_interval: Option<SignedDuration>,
    /// Wait before the first describe call.
    pub delay: Option<SignedDuration>,
    /// Consecutive target observations required.
    pub target_occurrences: Option<u32>,
    /// Consecutive absences tolerated.
    pub not_found_tolerance: Option<u32>,
    /// Fail on states that are not listed.
    pub strict_pending: bool,
}

impl PollConfig {
    /// Builds a [`PollSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NegativeDuration`] when a duration is negative.
    pub fn to_spec(&self) -> Result<PollSpec<ResourceState>, ConfigError> {
        let mut spec = PollSpec::new()
            .pending(self.pending.iter().cloned())
            .target(self.target.iter().cloned())
            .fail(self.fail.iter().cloned())
            .strict_pending(self.strict_pending);

        if self.deletion {
            spec = spec.deletion();
        }

        if let Some(timeout) = to_duration(self.timeout, "timeout")? {
            spec = spec.timeout(timeout);
        }

        if let Some(poll_interval) = to_duration(self.poll_interval, "poll_interval")? {
            spec = spec.poll_interval(poll_interval);
        }

        if let Some(min_interval) = to_duration(self.min_interval, "min_interval")? {
            spec = spec.min_interval(min_interval);
        }

        if let Some(delay) = to_duration(self.delay, "delay")? {
            spec = spec.delay(delay);
        }

        if let Some(occurrences) = self.target_occurrences {
            spec = spec.target_occurrences(occurrences);
        }

        if let Some(tolerance) = self.not_found_tolerance {
            spec = spec.not_found_tolerance(tolerance);
        }

        Ok(spec)
    }
}

fn to_duration(value: Option<SignedDuration>, field: &'static str) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|duration| {
            if duration.is_negative() {
                Err(ConfigError::NegativeDuration { field })
            } else {
                Ok(duration.unsigned_abs())
            }
        })
        .transpose()
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_retry_config_matches_defaults() {
        let config: RetryConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.to_policy().unwrap(), RetryPolicy::new());
    }

    #[test]
    fn retry_config_accepts_friendly_and_iso_durations() {
        let config: RetryConfig = serde_json::from_str(
            r#"{
                "max_elapsed": "2m 30s",
                "initial_delay": "PT1S",
                "increment": "2s",
                "max_delay": "10s",
                "retry_not_found": true,
                "jitter": true
            }"#,
        )
        .unwrap();
        let policy = config.to_policy().unwrap();

        assert_eq!(policy.get_max_elapsed(), Duration::from_secs(150));
        assert_eq!(policy.scheduler().initial_delay(), Duration::from_secs(1));
        assert_eq!(policy.scheduler().backoff(), Backoff::incremental(Duration::from_secs(2)));
        assert_eq!(policy.scheduler().max_delay(), Duration::from_secs(10));
        assert!(policy.is_retry_not_found());
        assert!(policy.is_jitter());
    }

    #[test]
    fn retry_config_multiplier() {
        let config: RetryConfig = serde_json::from_str(r#"{ "multiplier": 2.0 }"#).unwrap();

        assert_eq!(config.to_policy().unwrap().scheduler().backoff(), Backoff::exponential(2.0));
    }

    #[test]
    fn conflicting_backoff_is_rejected() {
        let config = RetryConfig {
            increment: Some(SignedDuration::from_secs(1)),
            multiplier: Some(2.0),
            ..RetryConfig::default()
        };

        assert_eq!(config.to_policy().unwrap_err(), ConfigError::ConflictingBackoff);
        assert_eq!(
            ConfigError::ConflictingBackoff.to_string(),
            "'increment' and 'multiplier' are mutually exclusive"
        );
    }

    #[test]
    fn negative_duration_is_rejected() {
        let config = RetryConfig {
            max_delay: Some(SignedDuration::from_secs(-1)),
            ..RetryConfig::default()
        };

        let error = config.to_policy().unwrap_err();
        assert_eq!(error, ConfigError::NegativeDuration { field: "max_delay" });
        assert_eq!(error.to_string(), "'max_delay' must not be negative");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        serde_json::from_str::<RetryConfig>(r#"{ "max_attempts": 3 }"#).unwrap_err();
        serde_json::from_str::<PollConfig>(r#"{ "interval": "5s" }"#).unwrap_err();
    }

    #[test]
    fn empty_poll_config_matches_defaults() {
        let config: PollConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.to_spec().unwrap(), PollSpec::new());
    }

    #[test]
    fn poll_config_to_spec() {
        let config: PollConfig = serde_json::from_str(
            r#"{
                "pending": ["Pending"],
                "target": ["Available"],
                "fail": ["Failed"],
                "timeout": "PT10M",
                "poll_interval": "10s",
                "min_interval": "3s",
                "delay": "5s",
                "target_occurrences": 2,
                "not_found_tolerance": 3,
                "strict_pending": true
            }"#,
        )
        .unwrap();

        let expected = PollSpec::new()
            .pending(["Pending"])
            .target(["Available"])
            .fail(["Failed"])
            .timeout(Duration::from_secs(600))
            .poll_interval(Duration::from_secs(10))
            .min_interval(Duration::from_secs(3))
            .delay(Duration::from_secs(5))
            .target_occurrences(2)
            .not_found_tolerance(3)
            .strict_pending(true);

        assert_eq!(config.to_spec().unwrap(), expected);
    }

    #[test]
    fn poll_config_deletion() {
        let config: PollConfig = serde_json::from_str(r#"{ "deletion": true, "pending": ["Deleting"] }"#).unwrap();
        let spec = config.to_spec().unwrap();

        assert!(spec.is_deletion());
    }

    #[test]
    fn poll_config_negative_timeout() {
        let config = PollConfig {
            timeout: Some(SignedDuration::from_secs(-5)),
            ..PollConfig::default()
        };

        assert_eq!(config.to_spec().unwrap_err(), ConfigError::NegativeDuration { field: "timeout" });
    }
}
