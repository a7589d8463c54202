// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{self, Debug, Display, Formatter};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::utils::TelemetryHelper;
use crate::{Context, ErrorClassifier, InvokeError, Observation, PollSpec, RemoteError, RetryPolicy, RetryingInvoker, StateConditionPoller};

const MUTATE_OPERATION_NAME: &str = "mutate";

/// The outcome of waiting for a resource to settle.
#[derive(Debug)]
#[must_use]
pub enum LifecycleResult<S, E> {
    /// The resource reached a target state, or disappeared when waiting for a deletion.
    Succeeded(Observation<S>),

    /// The mutation failed, the resource entered a fail state, went missing, or could not
    /// be described.
    Failed(LifecycleError<S, E>),

    /// The resource did not settle within the timeout.
    TimedOut(LifecycleError<S, E>),

    /// The cancellation token fired.
    Cancelled(LifecycleError<S, E>),
}

impl<S, E> LifecycleResult<S, E> {
    /// Converts into a `Result` for `?` propagation.
    ///
    /// # Errors
    ///
    /// Returns the [`LifecycleError`] of every outcome other than `Succeeded`.
    pub fn into_result(self) -> Result<Observation<S>, LifecycleError<S, E>> {
        match self {
            Self::Succeeded(observation) => Ok(observation),
            Self::Failed(error) | Self::TimedOut(error) | Self::Cancelled(error) => Err(error),
        }
    }

    /// Returns `true` for [`LifecycleResult::Succeeded`].
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Returns `true` for [`LifecycleResult::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns `true` for [`LifecycleResult::TimedOut`].
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// Returns `true` for [`LifecycleResult::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// The last observation of the resource, if it was described at least once.
    #[must_use]
    pub fn last_observed(&self) -> Option<&Observation<S>> {
        match self {
            Self::Succeeded(observation) => Some(observation),
            Self::Failed(error) | Self::TimedOut(error) | Self::Cancelled(error) => error.last_observed(),
        }
    }

    /// The error of every outcome other than `Succeeded`.
    #[must_use]
    pub fn error(&self) -> Option<&LifecycleError<S, E>> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(error) | Self::TimedOut(error) | Self::Cancelled(error) => Some(error),
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "resource is only logged")
    )]
    pub(crate) fn emit_telemetry(&self, telemetry: &TelemetryHelper, resource: &str)
    where
        S: Display,
        E: Display,
    {
        #[cfg(any(feature = "logs", test))]
        if telemetry.logs_enabled {
            let pipeline_name = &telemetry.pipeline_name;
            let operation_name = &telemetry.operation_name;

            match self {
                Self::Succeeded(observation) => tracing::event!(
                    name: "settle.settled",
                    tracing::Level::INFO,
                    pipeline.name = %pipeline_name,
                    operation.name = %operation_name,
                    resource = resource,
                    settle.observed = %observation,
                ),
                Self::Failed(error) => tracing::event!(
                    name: "settle.failed",
                    tracing::Level::WARN,
                    pipeline.name = %pipeline_name,
                    operation.name = %operation_name,
                    resource = resource,
                    error = %error,
                ),
                Self::TimedOut(error) => tracing::event!(
                    name: "settle.timed_out",
                    tracing::Level::WARN,
                    pipeline.name = %pipeline_name,
                    operation.name = %operation_name,
                    resource = resource,
                    error = %error,
                ),
                Self::Cancelled(error) => tracing::event!(
                    name: "settle.cancelled",
                    tracing::Level::INFO,
                    pipeline.name = %pipeline_name,
                    operation.name = %operation_name,
                    resource = resource,
                    error = %error,
                ),
            }
        }

        #[cfg(any(feature = "metrics", test))]
        if telemetry.metrics_enabled() {
            use crate::telemetry::{CANCELLED_EVENT, FAILED_EVENT, SETTLED_EVENT, TIMED_OUT_EVENT};

            let event = match self {
                Self::Succeeded(_) => SETTLED_EVENT,
                Self::Failed(_) => FAILED_EVENT,
                Self::TimedOut(_) => TIMED_OUT_EVENT,
                Self::Cancelled(_) => CANCELLED_EVENT,
            };

            telemetry.report_event(event, &[]);
        }
    }
}

/// Why a resource did not settle.
#[derive(Debug)]
#[non_exhaustive]
pub enum LifecycleErrorKind<S, E> {
    /// The mutating call failed.
    Mutation(InvokeError<E>),

    /// A describe call failed with an error that was not retried or ran out of budget.
    Describe(InvokeError<E>),

    /// The resource entered one of the fail states.
    FailState(S),

    /// The resource does not exist, and the wait was not for a deletion.
    ///
    /// Holds the describe error that reported the absence, or `None` when the describe
    /// call returned [`Observation::Absent`].
    NotFound(Option<InvokeError<E>>),

    /// The resource entered a state that is neither pending, target nor fail.
    UnexpectedState(S),

    /// The resource did not settle within `timeout`.
    TimedOut {
        /// The configured timeout.
        timeout: Duration,
        /// The target states that were waited for.
        expected: Vec<S>,
        /// Whether the wait was for a deletion.
        deletion: bool,
    },

    /// The cancellation token fired.
    Cancelled,
}

/// An error describing why a resource did not settle.
///
/// Carries the resource identifier and the last observation so the message is useful
/// without further context, e.g.
/// `resource "i-123" did not reach [Running] within 2s, last observed: Pending`.
#[derive(Debug)]
pub struct LifecycleError<S, E> {
    kind: LifecycleErrorKind<S, E>,
    resource: String,
    last_observed: Option<Observation<S>>,
}

impl<S, E> LifecycleError<S, E> {
    pub(crate) fn new(kind: LifecycleErrorKind<S, E>, resource: &str, last_observed: Option<Observation<S>>) -> Self {
        Self {
            kind,
            resource: resource.to_owned(),
            last_observed,
        }
    }

    /// The reason.
    #[must_use]
    pub fn kind(&self) -> &LifecycleErrorKind<S, E> {
        &self.kind
    }

    /// The identifier of the resource.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The last observation of the resource, if it was described at least once.
    #[must_use]
    pub fn last_observed(&self) -> Option<&Observation<S>> {
        self.last_observed.as_ref()
    }

    /// Consumes the error and returns the reason.
    #[must_use]
    pub fn into_kind(self) -> LifecycleErrorKind<S, E> {
        self.kind
    }
}

impl<S: Display, E: Display> Display for LifecycleError<S, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let resource = &self.resource;

        match &self.kind {
            LifecycleErrorKind::Mutation(error) => write!(f, "mutating resource \"{resource}\" failed: {error}"),
            LifecycleErrorKind::Describe(error) => write!(f, "describing resource \"{resource}\" failed: {error}"),
            LifecycleErrorKind::FailState(state) => write!(f, "resource \"{resource}\" entered fail state {state}"),
            LifecycleErrorKind::NotFound(Some(error)) => write!(f, "resource \"{resource}\" not found: {error}"),
            LifecycleErrorKind::NotFound(None) => write!(f, "resource \"{resource}\" not found"),
            LifecycleErrorKind::UnexpectedState(state) => {
                write!(f, "resource \"{resource}\" entered unexpected state {state}")
            }
            LifecycleErrorKind::TimedOut {
                timeout,
                deletion: true,
                ..
            } => {
                write!(f, "resource \"{resource}\" was not deleted within {timeout:?}, last observed: ")?;
                self.fmt_last_observed(f)
            }
            LifecycleErrorKind::TimedOut { timeout, expected, .. } => {
                write!(f, "resource \"{resource}\" did not reach [")?;
                for (index, state) in expected.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{state}")?;
                }
                write!(f, "] within {timeout:?}, last observed: ")?;
                self.fmt_last_observed(f)
            }
            LifecycleErrorKind::Cancelled => write!(f, "waiting for resource \"{resource}\" was cancelled"),
        }
    }
}

impl<S: Display, E> LifecycleError<S, E> {
    fn fmt_last_observed(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.last_observed {
            Some(observation) => write!(f, "{observation}"),
            None => f.write_str("nothing"),
        }
    }
}

impl<S, E> std::error::Error for LifecycleError<S, E>
where
    S: Debug + Display,
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            LifecycleErrorKind::Mutation(error) | LifecycleErrorKind::Describe(error) | LifecycleErrorKind::NotFound(Some(error)) => {
                Some(error)
            }
            _ => None,
        }
    }
}

/// Runs a mutating call and waits until the affected resource settles.
///
/// The synchronizer composes a [`RetryingInvoker`] for the mutation with a
/// [`StateConditionPoller`] for the wait. Use [`execute`][Self::execute] for the common
/// case. When the describe call needs data from the mutation response, such as the
/// identifier of a new resource, call [`mutate`][Self::mutate] and [`wait`][Self::wait]
/// separately.
///
/// # Examples
///
/// ```
/// # use std::fmt;
/// use std::time::Duration;
///
/// use settle::{Context, ErrorClassifier, LifecycleSynchronizer, Observation, PollSpec, RetryPolicy};
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
/// # async fn start_instance(id: &str) -> Result<(), ApiError> { Ok(()) }
/// # async fn describe_instance(id: &str) -> Result<Observation, ApiError> { Ok(Observation::Present("Running".into())) }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let context = Context::new(Clock::new_frozen()).name("instance_handler");
/// let synchronizer = LifecycleSynchronizer::new(&context, ErrorClassifier::new().transient_codes(["IncorrectInstanceStatus"]));
///
/// let policy = RetryPolicy::new();
/// let spec: PollSpec = PollSpec::new()
///     .pending(["Starting"])
///     .target(["Running"])
///     .timeout(Duration::from_secs(300));
///
/// synchronizer
///     .execute("i-123", || start_instance("i-123"), || describe_instance("i-123"), &policy, &spec)
///     .await
///     .into_result()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LifecycleSynchronizer {
    context: Context,
    classifier: ErrorClassifier,
    cancellation: Option<CancellationToken>,
}

impl LifecycleSynchronizer {
    /// Creates a synchronizer.
    #[must_use]
    pub fn new(context: &Context, classifier: ErrorClassifier) -> Self {
        Self {
            context: context.clone(),
            classifier,
            cancellation: None,
        }
    }

    /// Shares `token` between the mutation and the wait.
    #[must_use]
    pub fn cancellation(self, token: CancellationToken) -> Self {
        Self {
            cancellation: Some(token),
            ..self
        }
    }

    /// The classifier applied to mutation and describe errors.
    #[must_use]
    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Runs the mutating call with retries.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] when the call did not succeed.
    pub async fn mutate<T, E, F, Fut>(&self, operation: F, policy: &RetryPolicy) -> Result<T, InvokeError<E>>
    where
        E: RemoteError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        RetryingInvoker::new(&self.context, &self.classifier, policy)
            .name(MUTATE_OPERATION_NAME)
            .with_cancellation(self.cancellation.as_ref())
            .invoke(operation)
            .await
    }

    /// Polls the resource until it settles according to `spec`.
    ///
    /// `policy` governs the retries of each describe call.
    pub async fn wait<S, E, F, Fut>(&self, resource: &str, describe: F, policy: &RetryPolicy, spec: &PollSpec<S>) -> LifecycleResult<S, E>
    where
        S: PartialEq + Clone + Debug + Display,
        E: RemoteError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<S>, E>>,
    {
        StateConditionPoller::new(&self.context, &self.classifier, policy)
            .with_cancellation(self.cancellation.as_ref())
            .poll_until(resource, describe, spec)
            .await
    }

    /// Runs the mutating call, then polls the resource until it settles.
    ///
    /// When the mutation fails no describe call is made: the result is
    /// [`LifecycleResult::Failed`] with [`LifecycleErrorKind::Mutation`], or
    /// [`LifecycleResult::Cancelled`] when the token fired.
    pub async fn execute<T, S, E, M, MFut, D, DFut>(
        &self,
        resource: &str,
        mutation: M,
        describe: D,
        policy: &RetryPolicy,
        spec: &PollSpec<S>,
    ) -> LifecycleResult<S, E>
    where
        S: PartialEq + Clone + Debug + Display,
        E: RemoteError,
        M: FnMut() -> MFut,
        MFut: Future<Output = Result<T, E>>,
        D: FnMut() -> DFut,
        DFut: Future<Output = Result<Observation<S>, E>>,
    {
        if let Err(error) = self.mutate(mutation, policy).await {
            let cancelled = error.is_cancelled();
            let error = LifecycleError::new(LifecycleErrorKind::Mutation(error), resource, None);
            let result = if cancelled {
                LifecycleResult::Cancelled(error)
            } else {
                LifecycleResult::Failed(error)
            };

            result.emit_telemetry(&self.context.create_telemetry(Cow::Borrowed(MUTATE_OPERATION_NAME)), resource);
            return result;
        }

        self.wait(resource, describe, policy, spec).await
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use opentelemetry::KeyValue;
    use tick::{Clock, ClockControl};

    use super::*;
    use crate::telemetry::{EVENT_NAME, FAILED_EVENT, OPERATION_NAME};
    use crate::testing::{LogCapture, MetricTester, TestError};
    use crate::{ErrorClass, ResourceState};

    type Error = LifecycleError<ResourceState, TestError>;

    fn auto_clock() -> Clock {
        ClockControl::new().auto_advance_timers(true).to_clock()
    }

    fn running() -> Result<Observation, TestError> {
        Ok(Observation::Present(ResourceState::from_static("Running")))
    }

    #[tokio::test]
    async fn execute_mutates_then_waits() {
        let context = Context::new(auto_clock());
        let synchronizer = LifecycleSynchronizer::new(&context, ErrorClassifier::new());
        let mutations = AtomicU32::new(0);
        let describes = AtomicU32::new(0);
        let spec = PollSpec::new().target(["Running"]);

        let result = synchronizer
            .execute(
                "i-123",
                || {
                    mutations.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, TestError>(()) }
                },
                || {
                    describes.fetch_add(1, Ordering::SeqCst);
                    async { running() }
                },
                &RetryPolicy::new(),
                &spec,
            )
            .await;

        assert!(result.is_succeeded());
        assert_eq!(mutations.load(Ordering::SeqCst), 1);
        assert_eq!(describes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_mutation_skips_polling() {
        let context = Context::new(auto_clock());
        let synchronizer = LifecycleSynchronizer::new(&context, ErrorClassifier::new());
        let describes = AtomicU32::new(0);
        let spec = PollSpec::new().target(["Running"]);

        let result = synchronizer
            .execute(
                "i-123",
                || async { Err::<(), _>(TestError::from_code("QuotaExceeded")) },
                || {
                    describes.fetch_add(1, Ordering::SeqCst);
                    async { running() }
                },
                &RetryPolicy::new(),
                &spec,
            )
            .await;

        assert!(result.is_failed());
        assert_eq!(describes.load(Ordering::SeqCst), 0);
        assert!(result.last_observed().is_none());

        let error = result.into_result().unwrap_err();
        assert_eq!(error.resource(), "i-123");
        assert!(matches!(
            error.kind(),
            LifecycleErrorKind::Mutation(InvokeError::Rejected {
                class: ErrorClass::Fatal,
                ..
            })
        ));
        assert_eq!(
            error.to_string(),
            "mutating resource \"i-123\" failed: fatal error after 1 attempt: remote call failed with code QuotaExceeded"
        );
    }

    #[tokio::test]
    async fn cancelled_mutation_is_cancelled() {
        let context = Context::new(auto_clock());
        let token = CancellationToken::new();
        token.cancel();
        let synchronizer = LifecycleSynchronizer::new(&context, ErrorClassifier::new()).cancellation(token);
        let spec = PollSpec::new().target(["Running"]);

        let result = synchronizer
            .execute("i-123", || async { Ok::<_, TestError>(()) }, || async { running() }, &RetryPolicy::new(), &spec)
            .await;

        assert!(result.is_cancelled());
        assert!(matches!(
            result.error().map(LifecycleError::kind),
            Some(LifecycleErrorKind::Mutation(InvokeError::Cancelled { attempts: 0, .. }))
        ));
    }

    #[tokio::test]
    async fn mutate_returns_response_for_wait() {
        let context = Context::new(auto_clock());
        let synchronizer = LifecycleSynchronizer::new(&context, ErrorClassifier::new());
        let policy = RetryPolicy::new();
        let spec = PollSpec::new().target(["Available"]);

        let vpc_id = synchronizer
            .mutate(|| async { Ok::<_, TestError>(String::from("vpc-42")) }, &policy)
            .await
            .unwrap();

        let result = synchronizer
            .wait(
                &vpc_id,
                || async { Ok::<_, TestError>(Observation::Present(ResourceState::from_static("Available"))) },
                &policy,
                &spec,
            )
            .await;

        assert!(result.is_succeeded());
    }

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(LifecycleSynchronizer: Send, Sync, Debug, Clone);
        static_assertions::assert_impl_all!(LifecycleError<ResourceState, TestError>: std::error::Error, Send, Sync);
        static_assertions::assert_impl_all!(LifecycleResult<ResourceState, TestError>: Send, Sync, Debug);
    }

    #[test]
    fn runs_without_async_runtime() {
        let context = Context::new(Clock::new_frozen());
        let synchronizer = LifecycleSynchronizer::new(&context, ErrorClassifier::new());
        let spec = PollSpec::new().target(["Running"]);

        let result = futures::executor::block_on(synchronizer.execute(
            "i-123",
            || async { Ok::<_, TestError>(()) },
            || async { running() },
            &RetryPolicy::new(),
            &spec,
        ));

        assert!(result.is_succeeded());
    }

    #[test]
    fn into_result_and_accessors() {
        let error: Error = LifecycleError::new(
            LifecycleErrorKind::FailState(ResourceState::from_static("Failed")),
            "i-1",
            Some(Observation::Present(ResourceState::from_static("Failed"))),
        );
        let result = LifecycleResult::Failed(error);

        assert!(result.is_failed());
        assert!(!result.is_succeeded());
        assert!(!result.is_timed_out());
        assert!(!result.is_cancelled());
        assert_eq!(result.last_observed(), Some(&Observation::Present("Failed".into())));

        let error = result.into_result().unwrap_err();
        assert_eq!(error.to_string(), "resource \"i-1\" entered fail state Failed");
        assert!(matches!(error.into_kind(), LifecycleErrorKind::FailState(state) if state == "Failed"));
    }

    #[test]
    fn display_variants() {
        let timed_out: Error = LifecycleError::new(
            LifecycleErrorKind::TimedOut {
                timeout: Duration::from_secs(2),
                expected: vec!["Running".into(), "Stopped".into()],
                deletion: false,
            },
            "i-1",
            Some(Observation::Present("Pending".into())),
        );
        let deletion: Error = LifecycleError::new(
            LifecycleErrorKind::TimedOut {
                timeout: Duration::from_millis(1500),
                expected: Vec::new(),
                deletion: true,
            },
            "i-1",
            Some(Observation::Present("Deleting".into())),
        );
        let unexpected: Error = LifecycleError::new(LifecycleErrorKind::UnexpectedState("Stopped".into()), "i-1", None);
        let cancelled: Error = LifecycleError::new(LifecycleErrorKind::Cancelled, "i-1", None);

        assert_eq!(
            timed_out.to_string(),
            "resource \"i-1\" did not reach [Running, Stopped] within 2s, last observed: Pending"
        );
        assert_eq!(
            deletion.to_string(),
            "resource \"i-1\" was not deleted within 1.5s, last observed: Deleting"
        );
        assert_eq!(unexpected.to_string(), "resource \"i-1\" entered unexpected state Stopped");
        assert_eq!(cancelled.to_string(), "waiting for resource \"i-1\" was cancelled");
    }

    #[test]
    fn source_exposes_invoke_error() {
        let error: Error = LifecycleError::new(
            LifecycleErrorKind::Describe(InvokeError::Rejected {
                error: TestError::from_message("denied"),
                class: ErrorClass::Fatal,
                attempts: 1,
            }),
            "i-1",
            None,
        );

        let source = std::error::Error::source(&error).unwrap();
        assert_eq!(source.to_string(), "fatal error after 1 attempt: denied");
        assert!(std::error::Error::source(&LifecycleError::<ResourceState, TestError>::new(LifecycleErrorKind::NotFound(None), "i-1", None)).is_none());

        let not_found: Error = LifecycleError::new(
            LifecycleErrorKind::NotFound(Some(InvokeError::Rejected {
                error: TestError::from_code("InvalidInstanceId.NotFound"),
                class: ErrorClass::NotFound,
                attempts: 1,
            })),
            "i-1",
            Some(Observation::Absent),
        );
        let source = std::error::Error::source(&not_found).unwrap();
        assert_eq!(source.to_string(), "not_found error after 1 attempt: remote call failed with code InvalidInstanceId.NotFound");
    }

    #[tokio::test]
    async fn failed_mutation_is_logged() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let context = Context::new(auto_clock()).name("vpc").enable_logs();
        let synchronizer = LifecycleSynchronizer::new(&context, ErrorClassifier::new());
        let spec = PollSpec::new().target(["Available"]);

        let result = synchronizer
            .execute(
                "vpc-1",
                || async { Err::<(), _>(TestError::from_code("InvalidCidrBlock")) },
                || async { running() },
                &RetryPolicy::new(),
                &spec,
            )
            .await;

        assert!(result.is_failed());
        capture.assert_contains("WARN");
        capture.assert_contains("operation.name=mutate");
        capture.assert_contains("InvalidCidrBlock");
    }

    #[cfg(not(miri))]
    #[tokio::test]
    async fn failed_mutation_is_counted() {
        let tester = MetricTester::new();
        let context = Context::new(auto_clock()).enable_metrics(tester.meter_provider());
        let synchronizer = LifecycleSynchronizer::new(&context, ErrorClassifier::new());
        let spec = PollSpec::new().target(["Available"]);

        let _ = synchronizer
            .execute(
                "vpc-1",
                || async { Err::<(), _>(TestError::from_code("InvalidCidrBlock")) },
                || async { running() },
                &RetryPolicy::new(),
                &spec,
            )
            .await;

        tester.assert_attributes_contain(&[KeyValue::new(OPERATION_NAME, "mutate"), KeyValue::new(EVENT_NAME, FAILED_EVENT)]);
    }
}
