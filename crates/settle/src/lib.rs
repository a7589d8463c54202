// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(
    not(all(feature = "logs", feature = "metrics", feature = "serde")),
    expect(
        rustdoc::broken_intra_doc_links,
        reason = "feature gated items are only linked when every feature is enabled"
    )
)]

//! Classified retries and state polling for asynchronous cloud resource lifecycles.
//!
//! Cloud control planes acknowledge a create, update or delete request long before the
//! resource actually reaches its new state. This crate provides the machinery to drive
//! such a request to completion:
//!
//! - [`ErrorClassifier`] maps a vendor error to an [`ErrorClass`]: transient, throttled,
//!   not found or fatal.
//! - [`BackoffScheduler`] computes the delay before each retry.
//! - [`RetryingInvoker`] runs one remote call, retrying retryable errors within a
//!   [`RetryPolicy`].
//! - [`StateConditionPoller`] describes a resource until it reaches a target state, enters a
//!   fail state, disappears or the [`PollSpec`] timeout elapses.
//! - [`LifecycleSynchronizer`] composes the invoker and the poller into a single
//!   mutate-then-wait step that yields a [`LifecycleResult`].
//!
//! # Runtime Agnostic Design
//!
//! Every sleep goes through the [`tick::Clock`] held by the [`Context`], so the crate works
//! with any async runtime and tests can control time with `tick::ClockControl`. Calls are
//! sequential; the only suspension points are the backoff and poll sleeps, and both can be
//! interrupted with a [`CancellationToken`].
//!
//! # Quick Start
//!
//! ```rust
//! # use std::fmt;
//! use std::time::Duration;
//!
//! use settle::{Context, ErrorClassifier, LifecycleSynchronizer, Observation, PollSpec, RemoteError, RetryPolicy};
//! use tick::Clock;
//!
//! #[derive(Debug)]
//! struct ApiError {
//!     code: String,
//! }
//! # impl fmt::Display for ApiError {
//! #     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.code) }
//! # }
//! # impl std::error::Error for ApiError {}
//!
//! impl RemoteError for ApiError {
//!     fn code(&self) -> Option<&str> {
//!         Some(&self.code)
//!     }
//! }
//! # async fn delete_vpc(id: &str) -> Result<(), ApiError> { Ok(()) }
//! # async fn describe_vpc(id: &str) -> Result<Observation, ApiError> { Ok(Observation::Absent) }
//!
//! # async fn example(clock: Clock) -> Result<(), Box<dyn std::error::Error>> {
//! let context = Context::new(&clock).name("vpc_handler");
//! let classifier = ErrorClassifier::new().transient_codes(["DependencyViolation"]);
//! let synchronizer = LifecycleSynchronizer::new(&context, classifier);
//!
//! let policy = RetryPolicy::new().max_elapsed(Duration::from_secs(60));
//! let spec: PollSpec = PollSpec::new().deletion().pending(["Deleting"]);
//!
//! synchronizer
//!     .execute("vpc-123", || delete_vpc("vpc-123"), || describe_vpc("vpc-123"), &policy, &spec)
//!     .await
//!     .into_result()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `logs`: emits `tracing` events for retries, polls and outcomes once
//!   [`Context::enable_logs`] is called.
//! - `metrics`: reports the `settle.event` OpenTelemetry counter once
//!   [`Context::enable_metrics`] is called. See [`telemetry`] for the attributes.
//! - `serde`: adds [`RetryConfig`] and [`PollConfig`] for loading policies from
//!   configuration files.

mod backoff;
mod classify;
mod constants;
mod context;
mod invoker;
mod lifecycle;
mod policy;
mod poll;
mod rnd;
mod utils;

pub mod telemetry;

#[cfg(feature = "serde")]
mod config;

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod testing;

pub use backoff::{Backoff, BackoffScheduler};
pub use classify::{ErrorClass, ErrorClassifier, RemoteError};
#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub use config::{ConfigError, PollConfig, RetryConfig};
pub use context::Context;
pub use invoker::{InvokeError, RetryingInvoker};
pub use lifecycle::{LifecycleError, LifecycleErrorKind, LifecycleResult, LifecycleSynchronizer};
pub use policy::RetryPolicy;
pub use poll::{Observation, PollSpec, ResourceState, StateConditionPoller};
#[doc(inline)]
pub use recoverable::{Recovery, RecoveryInfo, RecoveryKind};
#[doc(inline)]
pub use tokio_util::sync::CancellationToken;
