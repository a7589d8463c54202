// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Loads retry and polling settings from JSON.

use settle::{PollConfig, RetryConfig};

const SETTINGS: &str = r#"{
    "retry": { "max_elapsed": "2m", "initial_delay": "1s", "multiplier": 2.0, "max_delay": "20s" },
    "create": { "pending": ["Pending"], "target": ["Available"], "fail": ["Failed"], "timeout": "PT10M", "poll_interval": "10s" },
    "delete": { "deletion": true, "pending": ["Deleting"], "timeout": "5m" }
}"#;

#[derive(Debug, serde::Deserialize)]
struct Settings {
    retry: RetryConfig,
    create: PollConfig,
    delete: PollConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings: Settings = serde_json::from_str(SETTINGS)?;

    let policy = settings.retry.to_policy()?;
    let create = settings.create.to_spec()?;
    let delete = settings.delete.to_spec()?;

    println!("retry delays: {:?}", policy.scheduler().delays().take(6).collect::<Vec<_>>());
    println!("create waits for {:?} up to {:?}", create.get_target(), create.get_timeout());
    println!("delete waits up to {:?}, deletion: {}", delete.get_timeout(), delete.is_deletion());

    Ok(())
}
