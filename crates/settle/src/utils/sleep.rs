// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::pin::pin;
use std::time::Duration;

use futures_util::future::{Either, select};
use tick::Clock;
use tokio_util::sync::CancellationToken;

/// Sleeps on `clock` for `delay`.
///
/// Returns `false` when `cancellation` fires first. A token that is already cancelled
/// wins over an elapsed delay.
pub(crate) async fn sleep_unless_cancelled(clock: &Clock, cancellation: Option<&CancellationToken>, delay: Duration) -> bool {
    let Some(token) = cancellation else {
        clock.delay(delay).await;
        return true;
    };

    let cancelled = pin!(token.cancelled());
    let delay = pin!(clock.delay(delay));

    matches!(select(cancelled, delay).await, Either::Right(_))
}

pub(crate) fn is_cancelled(cancellation: Option<&CancellationToken>) -> bool {
    cancellation.is_some_and(CancellationToken::is_cancelled)
}
