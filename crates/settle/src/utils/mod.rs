// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod sleep;
pub(crate) use sleep::{is_cancelled, sleep_unless_cancelled};

mod telemetry_helper;
pub(crate) use telemetry_helper::TelemetryHelper;
