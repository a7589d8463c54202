// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Creates a simulated instance and waits until it is running.
//!
//! The simulated control plane throttles the first create request and reports the
//! instance as `Pending` for a few describe calls. Run with the `logs` feature to see
//! the retry and poll events.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use settle::{Context, ErrorClassifier, LifecycleSynchronizer, Observation, PollSpec, RemoteError, ResourceState, RetryPolicy};
use tick::Clock;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let clock = Clock::new_tokio();
    let context = Context::new(&clock).name("instance_handler").enable_logs();
    let classifier = ErrorClassifier::new().transient_codes(["IncorrectInstanceStatus"]);
    let synchronizer = LifecycleSynchronizer::new(&context, classifier);

    let policy = RetryPolicy::new()
        .initial_delay(Duration::from_millis(200))
        .max_elapsed(Duration::from_secs(10));
    let spec: PollSpec = PollSpec::new()
        .pending(["Pending"])
        .target(["Running"])
        .fail(["Terminated"])
        .timeout(Duration::from_secs(10))
        .poll_interval(Duration::from_millis(250));

    let api = SimulatedApi::default();
    let instance_id = synchronizer.mutate(|| api.run_instance(), &policy).await?;

    let observation = synchronizer
        .wait(&instance_id, || api.describe_instance(), &policy, &spec)
        .await
        .into_result()?;

    println!("{instance_id} is {observation}");

    Ok(())
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
    runs: AtomicU32,
    describes: AtomicU32,
}

impl SimulatedApi {
    async fn run_instance(&self) -> Result<String, ApiError> {
        if self.runs.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(ApiError("Throttling.User"));
        }

        Ok(String::from("i-0123456789"))
    }

    async fn describe_instance(&self) -> Result<Observation, ApiError> {
        let state = if self.describes.fetch_add(1, Ordering::SeqCst) < 3 {
            "Pending"
        } else {
            "Running"
        };

        Ok(Observation::Present(ResourceState::from_static(state)))
    }
}
