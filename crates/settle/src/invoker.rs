// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use recoverable::{Recovery, RecoveryInfo};
use tick::Clock;
use tokio_util::sync::CancellationToken;

use crate::utils::{TelemetryHelper, is_cancelled, sleep_unless_cancelled};
use crate::{Context, ErrorClass, ErrorClassifier, RemoteError, RetryPolicy};

const DEFAULT_OPERATION_NAME: &str = "invoke";

/// Runs a remote call and retries it according to the class of its errors.
///
/// Every failure is classified by the [`ErrorClassifier`]:
///
/// - [`ErrorClass::Fatal`], and [`ErrorClass::NotFound`] unless the policy opts in, are
///   returned at once as [`InvokeError::Rejected`].
/// - [`ErrorClass::Transient`] and [`ErrorClass::Throttled`] errors are retried after the
///   delay of the [`RetryPolicy`], or after the error's
///   [`retry_after`][RemoteError::retry_after] hint when it has one.
///
/// A retry is only scheduled if it would start within the policy's `max_elapsed` budget,
/// measured from the first attempt. Otherwise the last error is returned as
/// [`InvokeError::Exhausted`]. Attempts never overlap.
///
/// With a [`cancellation`][Self::cancellation] token the invoker checks the token before
/// every attempt and stops sleeping as soon as it fires. A call that is already in
/// flight always runs to completion.
///
/// # Examples
///
/// ```
/// # use std::fmt;
/// use settle::{Context, ErrorClassifier, RemoteError, RetryPolicy, RetryingInvoker};
/// use tick::Clock;
/// # #[derive(Debug)]
/// # struct ApiError;
/// # impl fmt::Display for ApiError {
/// #     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("api error") }
/// # }
/// # impl std::error::Error for ApiError {}
/// # impl RemoteError for ApiError {
/// #     fn code(&self) -> Option<&str> { None }
/// # }
///
/// # async fn create_vpc() -> Result<String, ApiError> { Ok("vpc-123".to_string()) }
/// # async fn example() -> Result<(), settle::InvokeError<ApiError>> {
/// let context = Context::new(Clock::new_frozen());
/// let classifier = ErrorClassifier::new();
/// let policy = RetryPolicy::new();
///
/// let vpc_id = RetryingInvoker::new(&context, &classifier, &policy)
///     .name("create_vpc")
///     .invoke(create_vpc)
///     .await?;
///
/// assert_eq!(vpc_id, "vpc-123");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RetryingInvoker<'a> {
    clock: Clock,
    classifier: &'a ErrorClassifier,
    policy: Cow<'a, RetryPolicy>,
    cancellation: Option<CancellationToken>,
    telemetry: TelemetryHelper,
}

impl<'a> RetryingInvoker<'a> {
    /// Creates an invoker that sleeps on the clock of `context`.
    #[must_use]
    pub fn new(context: &Context, classifier: &'a ErrorClassifier, policy: &'a RetryPolicy) -> Self {
        Self::from_parts(
            context.get_clock().clone(),
            classifier,
            Cow::Borrowed(policy),
            context.create_telemetry(Cow::Borrowed(DEFAULT_OPERATION_NAME)),
        )
    }

    pub(crate) fn from_parts(
        clock: Clock,
        classifier: &'a ErrorClassifier,
        policy: Cow<'a, RetryPolicy>,
        telemetry: TelemetryHelper,
    ) -> Self {
        Self {
            clock,
            classifier,
            policy,
            cancellation: None,
            telemetry,
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

    /// Stops retrying once `token` is cancelled.
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

    /// Runs `operation` until it succeeds, fails with an error that is not retried, the
    /// retry budget runs out, or the invoker is cancelled.
    ///
    /// `operation` must perform exactly one remote call per invocation.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] describing why no successful result was produced.
    #[cfg_attr(test, mutants::skip)] // causes test timeouts
    pub async fn invoke<T, E, F, Fut>(&self, mut operation: F) -> Result<T, InvokeError<E>>
    where
        E: RemoteError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let stopwatch = self.clock.stopwatch();
        let mut attempts: u32 = 0;
        let mut last_error = None;

        loop {
            if is_cancelled(self.cancellation.as_ref()) {
                return Err(InvokeError::Cancelled { last_error, attempts });
            }

            attempts = attempts.saturating_add(1);
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let class = self.classifier.classify(&error);
            if !self.policy.should_retry(class) {
                return Err(InvokeError::Rejected { error, class, attempts });
            }

            let retry_index = attempts - 1;
            let delay = self.policy.retry_delay(retry_index, error.retry_after());
            if stopwatch.elapsed().saturating_add(delay) > self.policy.get_max_elapsed() {
                return Err(InvokeError::Exhausted { error, class, attempts });
            }

            self.emit_telemetry(retry_index, delay, class, &error);

            if !sleep_unless_cancelled(&self.clock, self.cancellation.as_ref(), delay).await {
                return Err(InvokeError::Cancelled {
                    last_error: Some(error),
                    attempts,
                });
            }

            last_error = Some(error);
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "only logs use every argument")
    )]
    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(clippy::unused_self, reason = "unused when logs nor metrics are used")
    )]
    fn emit_telemetry(&self, retry_index: u32, delay: Duration, class: ErrorClass, error: &dyn Display) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "settle.retry",
                tracing::Level::WARN,
                pipeline.name = %self.telemetry.pipeline_name,
                operation.name = %self.telemetry.operation_name,
                settle.attempt.index = retry_index,
                settle.retry.delay = delay.as_secs_f32(),
                settle.error.class = %class,
                error = %error,
            );
        }

        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            use crate::telemetry::{ATTEMPT_INDEX, ERROR_CLASS, RETRY_EVENT};

            self.telemetry.report_event(
                RETRY_EVENT,
                &[
                    opentelemetry::KeyValue::new(ERROR_CLASS, class.as_str()),
                    opentelemetry::KeyValue::new(ATTEMPT_INDEX, i64::from(retry_index)),
                ],
            );
        }
    }
}

/// The reason a [`RetryingInvoker`] produced no result.
///
/// The remote error is kept verbatim so callers can still inspect vendor details.
#[derive(Debug)]
#[non_exhaustive]
pub enum InvokeError<E> {
    /// The error is not retried: it is [`ErrorClass::Fatal`], or [`ErrorClass::NotFound`]
    /// without the policy opt-in.
    Rejected {
        /// The remote error.
        error: E,
        /// Its class.
        class: ErrorClass,
        /// The number of attempts made, including the failed one.
        attempts: u32,
    },

    /// The error is retryable but the next attempt would start after the retry budget.
    Exhausted {
        /// The last remote error.
        error: E,
        /// Its class.
        class: ErrorClass,
        /// The number of attempts made.
        attempts: u32,
    },

    /// The cancellation token fired.
    Cancelled {
        /// The error of the attempt preceding the cancellation, if any.
        last_error: Option<E>,
        /// The number of attempts made before the cancellation.
        attempts: u32,
    },
}

impl<E> InvokeError<E> {
    /// The number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Rejected { attempts, .. } | Self::Exhausted { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// The class of the last remote error. `None` for cancellations.
    #[must_use]
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Rejected { class, .. } | Self::Exhausted { class, .. } => Some(*class),
            Self::Cancelled { .. } => None,
        }
    }

    /// The last remote error, if any.
    #[must_use]
    pub fn remote(&self) -> Option<&E> {
        match self {
            Self::Rejected { error, .. } | Self::Exhausted { error, .. } => Some(error),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Consumes the error and returns the last remote error, if any.
    #[must_use]
    pub fn into_remote(self) -> Option<E> {
        match self {
            Self::Rejected { error, .. } | Self::Exhausted { error, .. } => Some(error),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }

    /// Returns `true` if the invoker was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns `true` if the last remote error was classified as [`ErrorClass::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.class() == Some(ErrorClass::NotFound)
    }
}

impl<E: Display> Display for InvokeError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { error, class, attempts } => {
                write!(f, "{class} error after {}: {error}", Attempts(*attempts))
            }
            Self::Exhausted { error, class, attempts } => {
                write!(f, "retry budget exhausted after {}, last {class} error: {error}", Attempts(*attempts))
            }
            Self::Cancelled {
                last_error: Some(error),
                attempts,
            } => write!(f, "cancelled after {}, last error: {error}", Attempts(*attempts)),
            Self::Cancelled { last_error: None, attempts } => write!(f, "cancelled after {}", Attempts(*attempts)),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for InvokeError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.remote().map(|error| error as &(dyn std::error::Error + 'static))
    }
}

impl<E> Recovery for InvokeError<E> {
    fn recovery(&self) -> RecoveryInfo {
        self.class().map_or_else(RecoveryInfo::never, |class| class.recovery())
    }
}

struct Attempts(u32);

impl Display for Attempts {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => f.write_str("1 attempt"),
            n => write!(f, "{n} attempts"),
        }
    }
}
