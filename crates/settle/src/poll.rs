// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::cmp::{max, min};
use std::fmt::{self, Debug, Display, Formatter};
use std::time::Duration;

use tick::Clock;
use tokio_util::sync::CancellationToken;

use crate::constants::{DEFAULT_MIN_INTERVAL, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::utils::{TelemetryHelper, is_cancelled, sleep_unless_cancelled};
use crate::{
    Context, ErrorClassifier, LifecycleError, LifecycleErrorKind, LifecycleResult, RemoteError, RetryPolicy, RetryingInvoker,
};

const DEFAULT_OPERATION_NAME: &str = "describe";

/// The observable state of a cloud resource, e.g. `Pending`, `Running` or `Available`.
///
/// Mapping a vendor response to a `ResourceState` is the job of the describe closure.
/// Resource families with a closed set of states may use their own enum with the
/// [`StateConditionPoller`] instead.
///
/// # Examples
///
/// ```
/// use settle::ResourceState;
///
/// const RUNNING: ResourceState = ResourceState::from_static("Running");
///
/// assert_eq!(RUNNING, "Running");
/// assert_eq!(ResourceState::new(String::from("Running")), RUNNING);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct ResourceState(Cow<'static, str>);

impl ResourceState {
    /// Creates a state from a static string.
    #[must_use]
    pub const fn from_static(state: &'static str) -> Self {
        Self(Cow::Borrowed(state))
    }

    /// Creates a state.
    #[must_use]
    pub fn new(state: impl Into<Cow<'static, str>>) -> Self {
        Self(state.into())
    }

    /// Returns the state as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceState {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ResourceState {
    fn from(state: &'static str) -> Self {
        Self::from_static(state)
    }
}

impl From<String> for ResourceState {
    fn from(state: String) -> Self {
        Self(Cow::Owned(state))
    }
}

impl PartialEq<str> for ResourceState {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourceState {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The result of a single describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<S = ResourceState> {
    /// The resource exists and is in the given state.
    Present(S),

    /// The resource does not exist.
    Absent,
}

impl<S> Observation<S> {
    /// The observed state, if the resource exists.
    #[must_use]
    pub fn state(&self) -> Option<&S> {
        match self {
            Self::Present(state) => Some(state),
            Self::Absent => None,
        }
    }

    /// Consumes the observation and returns the state, if the resource exists.
    #[must_use]
    pub fn into_state(self) -> Option<S> {
        match self {
            Self::Present(state) => Some(state),
            Self::Absent => None,
        }
    }

    /// Returns `true` if the resource does not exist.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl<S: Display> Display for Observation<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(state) => Display::fmt(state, f),
            Self::Absent => f.write_str("<absent>"),
        }
    }
}

/// What a [`StateConditionPoller`] waits for, and for how long.
///
/// Defaults: a `10 minutes` timeout, a `5s` poll interval, no minimum interval, no
/// initial delay, a single target observation, and no tolerance for a missing resource.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use settle::PollSpec;
///
/// let create: PollSpec = PollSpec::new()
///     .pending(["Pending", "Starting"])
///     .target(["Running"])
///     .fail(["Failed"])
///     .timeout(Duration::from_secs(300));
///
/// let delete: PollSpec = PollSpec::new().deletion().pending(["Stopping", "Deleting"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PollSpec<S = ResourceState> {
    pending: Vec<S>,
    target: Vec<S>,
    fail: Vec<S>,
    deletion: bool,
    timeout: Duration,
    poll_interval: Duration,
    min_interval: Duration,
    delay: Duration,
    target_occurrences: u32,
    not_found_tolerance: u32,
    strict_pending: bool,
}

impl<S> Default for PollSpec<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> PollSpec<S> {
    /// Creates a spec with no states and the default timings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            target: Vec::new(),
            fail: Vec::new(),
            deletion: false,
            timeout: DEFAULT_POLL_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            min_interval: DEFAULT_MIN_INTERVAL,
            delay: Duration::ZERO,
            target_occurrences: 1,
            not_found_tolerance: 0,
            strict_pending: false,
        }
    }

    /// Adds states the resource passes through while the operation is in progress.
    #[must_use]
    pub fn pending<I>(mut self, states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<S>,
    {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    /// Adds states that mean the operation succeeded.
    #[must_use]
    pub fn target<I>(mut self, states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<S>,
    {
        self.target.extend(states.into_iter().map(Into::into));
        self
    }

    /// Adds states that mean the operation failed for good.
    #[must_use]
    pub fn fail<I>(mut self, states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<S>,
    {
        self.fail.extend(states.into_iter().map(Into::into));
        self
    }

    /// Waits for the resource to disappear. A missing resource ends the poll successfully.
    #[must_use]
    pub fn deletion(self) -> Self {
        Self { deletion: true, ..self }
    }

    /// Sets the overall budget, including the initial delay.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Sets the wait between two describe calls.
    #[must_use]
    pub fn poll_interval(self, poll_interval: Duration) -> Self {
        Self { poll_interval, ..self }
    }

    /// Sets a floor for the wait between two describe calls.
    #[must_use]
    pub fn min_interval(self, min_interval: Duration) -> Self {
        Self { min_interval, ..self }
    }

    /// Sets a wait before the first describe call.
    #[must_use]
    pub fn delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Requires the target state to be observed this many times in a row. Zero counts as one.
    #[must_use]
    pub fn target_occurrences(self, occurrences: u32) -> Self {
        Self {
            target_occurrences: occurrences.max(1),
            ..self
        }
    }

    /// Tolerates this many missing-resource observations in a row before failing.
    ///
    /// Control planes are often eventually consistent, so a resource may not be visible
    /// right after it was created. Has no effect on deletion specs.
    #[must_use]
    pub fn not_found_tolerance(self, tolerance: u32) -> Self {
        Self {
            not_found_tolerance: tolerance,
            ..self
        }
    }

    /// Fails on any state that is not listed as pending, target or fail.
    #[must_use]
    pub fn strict_pending(self, enable: bool) -> Self {
        Self {
            strict_pending: enable,
            ..self
        }
    }

    /// The overall budget.
    #[must_use]
    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// The target states.
    #[must_use]
    pub fn get_target(&self) -> &[S] {
        &self.target
    }

    /// Returns `true` for specs that wait for the resource to disappear.
    #[must_use]
    pub fn is_deletion(&self) -> bool {
        self.deletion
    }

    fn sleep_interval(&self) -> Duration {
        max(self.poll_interval, self.min_interval)
    }
}

/// Polls a resource until it settles.
///
/// Each poll runs the describe closure through a [`RetryingInvoker`], so throttling and
/// transient errors of the describe call are retried within the remaining budget. The
/// observation is then evaluated against the [`PollSpec`]:
///
/// - a missing resource ends a deletion spec successfully; otherwise it fails once the
///   tolerance is used up,
/// - a fail state ends the poll with a failure at once,
/// - a target state ends the poll successfully once seen the configured number of
///   times in a row,
/// - any other state is polled again after the poll interval.
///
/// The poll never ends because a describe call returned nothing useful. Without a
/// decision it keeps polling until the timeout, and then reports the last observation.
///
/// # Examples
///
/// ```
/// # use std::fmt;
/// use settle::{Context, ErrorClassifier, Observation, PollSpec, RetryPolicy, StateConditionPoller};
/// use tick::Clock;
/// # #[derive(Debug)]
/// # struct ApiError;
/// # impl fmt::Display for ApiError {
/// #     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("api error") }
/// # }
/// # impl std::error::Error for ApiError {}
/// # impl settle::RemoteError for ApiError {
/// #     fn code(&self) -> Option<&str> { None }
/// # }
///
/// # async fn example() {
/// let context = Context::new(Clock::new_frozen());
/// let classifier = ErrorClassifier::new();
/// let policy = RetryPolicy::new();
/// let spec: PollSpec = PollSpec::new().target(["Running"]).fail(["Failed"]);
///
/// let result = StateConditionPoller::new(&context, &classifier, &policy)
///     .poll_until("i-123", || async { Ok::<_, ApiError>(Observation::Present("Running".into())) }, &spec)
///     .await;
///
/// assert!(result.is_succeeded());
/// # }
/// ```
#[derive(Debug)]
pub struct StateConditionPoller<'a> {
    clock: Clock,
    classifier: &'a ErrorClassifier,
    policy: &'a RetryPolicy,
    cancellation: Option<CancellationToken>,
    telemetry: TelemetryHelper,
}

impl<'a> StateConditionPoller<'a> {
    /// Creates a poller. `policy` governs the retries of each describe call.
    #[must_use]
    pub fn new(context: &Context, classifier: &'a ErrorClassifier, policy: &'a RetryPolicy) -> Self {
        Self {
            clock: context.get_clock().clone(),
            classifier,
            policy,
            cancellation: None,
            telemetry: context.create_telemetry(Cow::Borrowed(DEFAULT_OPERATION_NAME)),
        }
    }

    /// Sets the operation name reported in telemetry. Prefer `snake_case`.
    #[must_use]
    pub fn name(self, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            telemetry: self.telemetry.for_operation(name.into()),
            ..self
        }
    }

    /// Stops polling once `token` is cancelled.
    #[must_use]
    pub fn cancellation(self, token: &CancellationToken) -> Self {
        Self {
            cancellation: Some(token.clone()),
            ..self
        }
    }

    pub(crate) fn with_cancellation(self, token: Option<&CancellationToken>) -> Self {
        Self {
            cancellation: token.cloned(),
            ..self
        }
    }

    /// Polls `resource` with `describe` until it settles according to `spec`.
    ///
    /// `describe` must perform exactly one remote call per invocation and report a missing
    /// resource either as [`Observation::Absent`] or as an error that the classifier maps to
    /// [`ErrorClass::NotFound`][crate::ErrorClass::NotFound]. A NotFound error is never
    /// retried within a deletion wait, even when the policy enables
    /// [`retry_not_found`][RetryPolicy::retry_not_found].
    ///
    /// Each describe call is retried on its own retryable errors within the time left before
    /// `timeout`. When those retries run out of budget, the wait ends early as
    /// [`LifecycleResult::Failed`] with kind [`Describe`][LifecycleErrorKind::Describe] holding
    /// [`InvokeError::Exhausted`][crate::InvokeError::Exhausted], instead of
    /// [`LifecycleResult::TimedOut`].
    #[cfg_attr(test, mutants::skip)] // mutating the timeout check causes infinite loops
    pub async fn poll_until<S, E, F, Fut>(&self, resource: &str, mut describe: F, spec: &PollSpec<S>) -> LifecycleResult<S, E>
    where
        S: PartialEq + Clone + Debug + Display,
        E: RemoteError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<S>, E>>,
    {
        let stopwatch = self.clock.stopwatch();
        let mut last_observed: Option<Observation<S>> = None;
        let mut progress = Progress::default();
        let mut not_found = None;

        if !spec.delay.is_zero() && !self.sleep(min(spec.delay, spec.timeout)).await {
            return self.finish(resource, LifecycleResult::Cancelled(cancelled(resource, last_observed)));
        }

        loop {
            let elapsed = stopwatch.elapsed();
            if elapsed >= spec.timeout {
                let error = LifecycleError::new(
                    LifecycleErrorKind::TimedOut {
                        timeout: spec.timeout,
                        expected: spec.target.clone(),
                        deletion: spec.deletion,
                    },
                    resource,
                    last_observed,
                );
                return self.finish(resource, LifecycleResult::TimedOut(error));
            }

            if is_cancelled(self.cancellation.as_ref()) {
                return self.finish(resource, LifecycleResult::Cancelled(cancelled(resource, last_observed)));
            }

            let mut policy = self.policy.budget_at_most(spec.timeout.saturating_sub(elapsed));
            if spec.deletion {
                policy = policy.retry_not_found(false);
            }

            let invoker = RetryingInvoker::from_parts(self.clock.clone(), self.classifier, Cow::Owned(policy), self.telemetry.clone())
                .with_cancellation(self.cancellation.as_ref());

            let observation = match invoker.invoke(&mut describe).await {
                Ok(observation) => {
                    not_found = None;
                    observation
                }
                Err(error) if error.is_not_found() => {
                    not_found = Some(error);
                    Observation::Absent
                }
                Err(error) if error.is_cancelled() => {
                    return self.finish(resource, LifecycleResult::Cancelled(cancelled(resource, last_observed)));
                }
                Err(error) => {
                    let error = LifecycleError::new(LifecycleErrorKind::Describe(error), resource, last_observed);
                    return self.finish(resource, LifecycleResult::Failed(error));
                }
            };

            match progress.observe(spec, &observation) {
                Verdict::Continue => {}
                Verdict::Settled => return self.finish(resource, LifecycleResult::Succeeded(observation)),
                Verdict::NotFound => {
                    let error = LifecycleError::new(LifecycleErrorKind::NotFound(not_found), resource, Some(observation));
                    return self.finish(resource, LifecycleResult::Failed(error));
                }
                Verdict::Failed(kind) => {
                    let error = LifecycleError::new(kind, resource, Some(observation));
                    return self.finish(resource, LifecycleResult::Failed(error));
                }
            }

            self.emit_poll(resource, &observation, stopwatch.elapsed());
            last_observed = Some(observation);

            let remaining = spec.timeout.saturating_sub(stopwatch.elapsed());
            if !self.sleep(min(spec.sleep_interval(), remaining)).await {
                return self.finish(resource, LifecycleResult::Cancelled(cancelled(resource, last_observed)));
            }
        }
    }

    async fn sleep(&self, delay: Duration) -> bool {
        sleep_unless_cancelled(&self.clock, self.cancellation.as_ref(), delay).await
    }

    fn finish<S: Display, E: Display>(&self, resource: &str, result: LifecycleResult<S, E>) -> LifecycleResult<S, E> {
        result.emit_telemetry(&self.telemetry, resource);
        result
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "only logs use every argument")
    )]
    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(clippy::unused_self, reason = "unused when logs nor metrics are used")
    )]
    fn emit_poll<S: Display>(&self, resource: &str, observation: &Observation<S>, elapsed: Duration) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "settle.poll",
                tracing::Level::DEBUG,
                pipeline.name = %self.telemetry.pipeline_name,
                operation.name = %self.telemetry.operation_name,
                resource = resource,
                settle.observed = %observation,
                settle.elapsed = elapsed.as_secs_f32(),
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            self.telemetry.report_event(crate::telemetry::POLL_EVENT, &[]);
        }
    }
}

/// Consecutive observations that count towards a decision.
#[derive(Debug, Default)]
struct Progress {
    absences: u32,
    target_hits: u32,
}

enum Verdict<S, E> {
    Continue,
    Settled,
    NotFound,
    Failed(LifecycleErrorKind<S, E>),
}

impl Progress {
    fn observe<S: PartialEq + Clone, E>(&mut self, spec: &PollSpec<S>, observation: &Observation<S>) -> Verdict<S, E> {
        let state = match observation {
            Observation::Absent if spec.deletion => return Verdict::Settled,
            Observation::Absent => {
                self.target_hits = 0;
                self.absences = self.absences.saturating_add(1);

                return if self.absences > spec.not_found_tolerance {
                    Verdict::NotFound
                } else {
                    Verdict::Continue
                };
            }
            Observation::Present(state) => state,
        };

        self.absences = 0;

        if spec.fail.contains(state) {
            return Verdict::Failed(LifecycleErrorKind::FailState(state.clone()));
        }

        if spec.target.contains(state) {
            self.target_hits = self.target_hits.saturating_add(1);
            return if self.target_hits >= spec.target_occurrences {
                Verdict::Settled
            } else {
                Verdict::Continue
            };
        }

        self.target_hits = 0;

        if spec.strict_pending && !spec.pending.contains(state) {
            return Verdict::Failed(LifecycleErrorKind::UnexpectedState(state.clone()));
        }

        Verdict::Continue
    }
}

fn cancelled<S, E>(resource: &str, last_observed: Option<Observation<S>>) -> LifecycleError<S, E> {
    LifecycleError::new(LifecycleErrorKind::Cancelled, resource, last_observed)
}
