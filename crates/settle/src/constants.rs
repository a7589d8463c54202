// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Upper bound on the time spent retrying a single remote call.
pub(crate) const DEFAULT_MAX_ELAPSED: Duration = Duration::from_secs(5 * 60);

/// Delay before the second attempt of a remote call.
pub(crate) const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(3);

/// Amount added to the delay for every further attempt.
pub(crate) const DEFAULT_INCREMENT: Duration = Duration::from_secs(3);

/// Cap applied to every computed backoff delay.
pub(crate) const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Overall budget for a resource to reach its target state.
pub(crate) const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Preferred wait between two describe calls.
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Floor for the wait between two describe calls. No floor unless configured.
pub(crate) const DEFAULT_MIN_INTERVAL: Duration = Duration::ZERO;

/// Error codes reported by control planes when the addressed object does not exist.
pub(crate) const DEFAULT_NOT_FOUND_CODES: &[&str] = &[
    "NotFound",
    "ResourceNotFound",
    "EntityNotExist",
    "OBJECT_NOT_FOUND",
    "InvalidInstanceId.NotFound",
    "Forbidden.NotFound",
];

/// Message fragments that identify a missing object when no code is available.
pub(crate) const DEFAULT_NOT_FOUND_MESSAGES: &[&str] = &["not found", "does not exist"];

/// Error codes reported by control planes when the caller is being rate limited.
pub(crate) const DEFAULT_THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "Throttling.User",
    "Throttling.Api",
    "Throttling.Resource",
    "ServiceUnavailable",
    "SystemBusy",
    "RequestLimitExceeded",
];

/// Suffix shared by the vendor specific not-found codes, e.g. `InvalidVpcID.NotFound` or
/// `ErrorClusterNotFound`.
pub(crate) const NOT_FOUND_CODE_SUFFIX: &str = "NotFound";

/// Prefix of the per resource type not-found codes, e.g. `ResourceNotFound.Listener`.
pub(crate) const NOT_FOUND_CODE_PREFIX: &str = "ResourceNotFound.";

pub(crate) const STATUS_NOT_FOUND: u16 = 404;
pub(crate) const STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub(crate) const STATUS_SERVICE_UNAVAILABLE: u16 = 503;
