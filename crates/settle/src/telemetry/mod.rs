// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Well-known telemetry keys and values.
//!
//! When the `metrics` feature is enabled and a meter provider is passed to
//! [`Context::enable_metrics`][crate::Context::enable_metrics], every retry, poll and
//! lifecycle outcome increments the `settle.event` counter. The counter carries the
//! attributes below.
//!
//! When the `logs` feature is enabled and [`Context::enable_logs`][crate::Context::enable_logs]
//! was called, the same occurrences are emitted as `tracing` events named
//! `settle.retry`, `settle.poll`, `settle.settled`, `settle.failed`, `settle.timed_out`
//! and `settle.cancelled`.
//!
//! Names follow the [OpenTelemetry naming guidelines](https://opentelemetry.io/docs/specs/semconv/general/naming/#general-naming-considerations).

#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;

/// Key used to annotate the name of the pipeline configured on the [`Context`][crate::Context].
///
/// Examples: `default`, `vpc_handler`, `instance_handler`.
pub const PIPELINE_NAME: &str = "settle.pipeline.name";

/// Key used to annotate the name of the operation, e.g. `create_instance` or `describe_instance`.
pub const OPERATION_NAME: &str = "settle.operation.name";

/// Key used to annotate the event being reported.
///
/// Values: [`RETRY_EVENT`], [`POLL_EVENT`], [`SETTLED_EVENT`], [`FAILED_EVENT`],
/// [`TIMED_OUT_EVENT`], [`CANCELLED_EVENT`].
pub const EVENT_NAME: &str = "settle.event.name";

/// Key used to annotate the class of the error that triggered a retry.
pub const ERROR_CLASS: &str = "settle.error.class";

/// Key used to annotate the zero-based index of the attempt that failed.
pub const ATTEMPT_INDEX: &str = "settle.attempt.index";

/// A failed remote call is retried.
pub const RETRY_EVENT: &str = "retry";

/// A resource was observed in a non-terminal state.
pub const POLL_EVENT: &str = "poll";

/// A resource reached its target state or disappeared as expected.
pub const SETTLED_EVENT: &str = "settled";

/// A lifecycle failed.
pub const FAILED_EVENT: &str = "failed";

/// A resource did not settle within its timeout.
pub const TIMED_OUT_EVENT: &str = "timed_out";

/// A lifecycle was cancelled by the caller.
pub const CANCELLED_EVENT: &str = "cancelled";
