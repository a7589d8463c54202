// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deletes a simulated VPC and waits until it is gone.
//!
//! The delete request first fails with a dependency conflict, which the classifier is
//! told to treat as transient. Once the VPC disappears the describe call fails with a
//! not-found error, which settles the deletion.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use settle::{Context, ErrorClassifier, LifecycleResult, LifecycleSynchronizer, Observation, PollSpec, RemoteError, ResourceState, RetryPolicy};
use tick::Clock;

#[tokio::main]
async fn main() {
    let clock = Clock::new_tokio();
    let context = Context::new(&clock).name("vpc_handler");
    let classifier = ErrorClassifier::new().transient_codes(["DependencyViolation"]);
    let synchronizer = LifecycleSynchronizer::new(&context, classifier);

    let policy = RetryPolicy::new()
        .initial_delay(Duration::from_millis(100))
        .max_elapsed(Duration::from_secs(5));
    let spec: PollSpec = PollSpec::new()
        .deletion()
        .pending(["Available", "Deleting"])
        .fail(["DeleteFailed"])
        .timeout(Duration::from_secs(5))
        .poll_interval(Duration::from_millis(200));

    let api = SimulatedApi::default();
    let result = synchronizer
        .execute("vpc-42", || api.delete_vpc(), || api.describe_vpc(), &policy, &spec)
        .await;

    match result {
        LifecycleResult::Succeeded(_) => println!("vpc-42 deleted"),
        LifecycleResult::Failed(error) | LifecycleResult::TimedOut(error) | LifecycleResult::Cancelled(error) => {
            println!("{error}");
        }
    }
}

#[derive(Debug)]
struct ApiError(&'static str);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request failed with code {}", self.0)
    }
}

impl std::error::Error for ApiError {}

impl RemoteError for ApiError {
    fn code(&self) -> Option<&str> {
        Some(self.0)
    }
}

#[derive(Debug, Default)]
struct SimulatedApi {
    deletes: AtomicU32,
    describes: AtomicU32,
}

impl SimulatedApi {
    async fn delete_vpc(&self) -> Result<(), ApiError> {
        if self.deletes.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err(ApiError("DependencyViolation"));
        }

        Ok(())
    }

    async fn describe_vpc(&self) -> Result<Observation, ApiError> {
        match self.describes.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => Ok(Observation::Present(ResourceState::from_static("Deleting"))),
            _ => Err(ApiError("InvalidVpcID.NotFound")),
        }
    }
}
