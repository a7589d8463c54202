// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use recoverable::{Recovery, RecoveryInfo};

use crate::constants::{
    DEFAULT_NOT_FOUND_CODES, DEFAULT_NOT_FOUND_MESSAGES, DEFAULT_THROTTLING_CODES, NOT_FOUND_CODE_PREFIX, NOT_FOUND_CODE_SUFFIX,
    STATUS_NOT_FOUND, STATUS_SERVICE_UNAVAILABLE, STATUS_TOO_MANY_REQUESTS,
};

/// The class of an error returned by a remote call.
///
/// The class decides what the [`RetryingInvoker`][crate::RetryingInvoker] does with the error:
/// transient and throttled errors are retried within the budget of the
/// [`RetryPolicy`][crate::RetryPolicy], everything else is returned to the caller.
///
/// # Examples
///
/// ```
/// use settle::{ErrorClass, Recovery, RecoveryKind};
///
/// assert!(ErrorClass::Throttled.is_retryable());
/// assert_eq!(ErrorClass::Fatal.recovery().kind(), RecoveryKind::Never);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The resource is busy, e.g. another operation is in progress on it.
    Transient,

    /// The remote API rejected the call because of rate limiting.
    Throttled,

    /// The addressed object does not exist.
    NotFound,

    /// Anything else. Never retried.
    Fatal,
}

impl ErrorClass {
    /// Returns `true` for classes that are retried by default.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::Throttled)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Throttled => "throttled",
            Self::NotFound => "not_found",
            Self::Fatal => "fatal",
        }
    }
}

impl Display for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Recovery for ErrorClass {
    fn recovery(&self) -> RecoveryInfo {
        if self.is_retryable() {
            RecoveryInfo::retry()
        } else {
            RecoveryInfo::never()
        }
    }
}

/// An error produced by a remote call that can be inspected by an [`ErrorClassifier`].
///
/// Implement this for the error type of the SDK that performs the remote calls. The
/// human readable message used for pattern matching is the [`Display`] output.
///
/// # Examples
///
/// ```
/// use std::fmt;
///
/// use settle::RemoteError;
///
/// #[derive(Debug)]
/// struct ApiError {
///     code: String,
///     status: u16,
/// }
///
/// impl fmt::Display for ApiError {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "api call failed with {} ({})", self.code, self.status)
///     }
/// }
///
/// impl std::error::Error for ApiError {}
///
/// impl RemoteError for ApiError {
///     fn code(&self) -> Option<&str> {
///         Some(&self.code)
///     }
///
///     fn status(&self) -> Option<u16> {
///         Some(self.status)
///     }
/// }
/// ```
pub trait RemoteError: std::error::Error {
    /// The vendor error code, e.g. `Throttling.User` or `InvalidVpcID.NotFound`.
    fn code(&self) -> Option<&str>;

    /// The HTTP-like status code of the failed call, if known.
    fn status(&self) -> Option<u16> {
        None
    }

    /// A server supplied hint for when the call may be attempted again.
    ///
    /// When present and the error is retried, the hint replaces the delay computed
    /// by the backoff schedule.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Classifies remote errors into an [`ErrorClass`].
///
/// Classification is a pure function of the error and the configured lists. The first
/// matching rule wins:
///
/// 1. [`ErrorClass::NotFound`] when the code is a known not-found code, starts with
///    `ResourceNotFound.` or ends with `NotFound`, the status is `404`, or the message
///    contains a not-found fragment.
/// 2. [`ErrorClass::Throttled`] when the code is a known throttling code or the status
///    is `429` or `503`.
/// 3. [`ErrorClass::Transient`] when the code is in the resource specific transient
///    allow-list or the message contains a transient fragment.
/// 4. [`ErrorClass::Fatal`] otherwise.
///
/// Codes match exactly. Message fragments match case-insensitively.
///
/// # Examples
///
/// ```
/// # use std::fmt;
/// use settle::{ErrorClass, ErrorClassifier, RemoteError};
/// # #[derive(Debug)]
/// # struct ApiError(&'static str);
/// # impl fmt::Display for ApiError {
/// #     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.0) }
/// # }
/// # impl std::error::Error for ApiError {}
/// # impl RemoteError for ApiError {
/// #     fn code(&self) -> Option<&str> { Some(self.0) }
/// # }
///
/// let classifier = ErrorClassifier::new().transient_codes(["IncorrectStatus.Listener", "OperationConflict"]);
///
/// assert_eq!(classifier.classify(&ApiError("InvalidVpcID.NotFound")), ErrorClass::NotFound);
/// assert_eq!(classifier.classify(&ApiError("Throttling.User")), ErrorClass::Throttled);
/// assert_eq!(classifier.classify(&ApiError("OperationConflict")), ErrorClass::Transient);
/// assert_eq!(classifier.classify(&ApiError("InvalidParameter")), ErrorClass::Fatal);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    not_found_codes: Vec<Cow<'static, str>>,
    not_found_messages: Vec<Cow<'static, str>>,
    throttling_codes: Vec<Cow<'static, str>>,
    transient_codes: Vec<Cow<'static, str>>,
    transient_messages: Vec<Cow<'static, str>>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassifier {
    /// Creates a classifier with the built-in not-found and throttling lists.
    ///
    /// The transient allow-list starts empty; resource specific busy codes are added with
    /// [`transient_codes`][Self::transient_codes].
    #[must_use]
    pub fn new() -> Self {
        Self::empty()
            .not_found_codes(DEFAULT_NOT_FOUND_CODES.iter().copied())
            .not_found_messages(DEFAULT_NOT_FOUND_MESSAGES.iter().copied())
            .throttling_codes(DEFAULT_THROTTLING_CODES.iter().copied())
    }

    /// Creates a classifier without any code or message lists.
    ///
    /// Status based rules and the `ResourceNotFound.` prefix and `NotFound` suffix of
    /// not-found codes still apply.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            not_found_codes: Vec::new(),
            not_found_messages: Vec::new(),
            throttling_codes: Vec::new(),
            transient_codes: Vec::new(),
            transient_messages: Vec::new(),
        }
    }

    /// Adds codes that mean the addressed object does not exist.
    #[must_use]
    pub fn not_found_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.not_found_codes.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Adds message fragments that mean the addressed object does not exist.
    #[must_use]
    pub fn not_found_messages<I>(mut self, fragments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.not_found_messages.extend(fragments.into_iter().map(lowercase));
        self
    }

    /// Adds codes that mean the call was rate limited.
    #[must_use]
    pub fn throttling_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.throttling_codes.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Adds resource specific codes that are safe to retry, e.g. `IncorrectStatus.Listener`.
    #[must_use]
    pub fn transient_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.transient_codes.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Adds message fragments that are safe to retry, e.g. `try again later`.
    #[must_use]
    pub fn transient_messages<I>(mut self, fragments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.transient_messages.extend(fragments.into_iter().map(lowercase));
        self
    }

    /// Classifies the given error.
    #[must_use]
    pub fn classify<E: RemoteError + ?Sized>(&self, error: &E) -> ErrorClass {
        let code = error.code();
        let status = error.status();

        // rendered at most once and only when a message list needs it
        let mut message: Option<String> = None;
        let mut message_contains = |fragments: &[Cow<'static, str>]| {
            if fragments.is_empty() {
                return false;
            }

            let message = message.get_or_insert_with(|| error.to_string().to_lowercase());
            fragments.iter().any(|fragment| message.contains(fragment.as_ref()))
        };

        if code.is_some_and(|code| is_not_found_code(code) || contains(&self.not_found_codes, code))
            || status == Some(STATUS_NOT_FOUND)
            || message_contains(&self.not_found_messages)
        {
            return ErrorClass::NotFound;
        }

        if code.is_some_and(|code| contains(&self.throttling_codes, code))
            || matches!(status, Some(STATUS_TOO_MANY_REQUESTS | STATUS_SERVICE_UNAVAILABLE))
        {
            return ErrorClass::Throttled;
        }

        if code.is_some_and(|code| contains(&self.transient_codes, code)) || message_contains(&self.transient_messages) {
            return ErrorClass::Transient;
        }

        ErrorClass::Fatal
    }
}

fn is_not_found_code(code: &str) -> bool {
    code.starts_with(NOT_FOUND_CODE_PREFIX) || code.ends_with(NOT_FOUND_CODE_SUFFIX)
}

fn contains(codes: &[Cow<'static, str>], code: &str) -> bool {
    codes.iter().any(|candidate| candidate == code)
}

fn lowercase(fragment: impl Into<Cow<'static, str>>) -> Cow<'static, str> {
    let fragment = fragment.into();

    if fragment.chars().any(char::is_uppercase) {
        Cow::Owned(fragment.to_lowercase())
    } else {
        fragment
    }
}
