// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use tick::Clock;

pub(crate) const DEFAULT_PIPELINE_NAME: &str = "default";

/// Shared dependencies of the retry and polling components.
///
/// A single `Context` carries the clock used for every backoff and poll sleep, the
/// pipeline name used to correlate telemetry, and the telemetry switches. Build it once
/// per handler and pass it to every component.
///
/// # Examples
///
/// ```
/// use settle::Context;
/// use tick::Clock;
///
/// let context = Context::new(Clock::new_frozen()).name("vpc_handler");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    clock: Clock,
    name: Cow<'static, str>,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<opentelemetry::metrics::Meter>,
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
}

impl Context {
    /// Creates a context with a clock. Initializes with `name = "default"`.
    pub fn new(clock: impl AsRef<Clock>) -> Self {
        Self {
            clock: clock.as_ref().clone(),
            name: Cow::Borrowed(DEFAULT_PIPELINE_NAME),
            #[cfg(any(feature = "metrics", test))]
            meter: None,
            #[cfg(any(feature = "logs", test))]
            logs_enabled: false,
        }
    }

    /// Sets the pipeline name for telemetry correlation. Prefer `snake_case`.
    #[must_use]
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables metrics reporting with the given OpenTelemetry meter provider.
    #[must_use]
    #[cfg(any(feature = "metrics", test))]
    pub fn enable_metrics(self, provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        Self {
            meter: Some(crate::telemetry::metrics::create_meter(provider)),
            ..self
        }
    }

    /// Enables structured logging of retries, polls and lifecycle outcomes.
    #[must_use]
    #[cfg(any(feature = "logs", test))]
    pub fn enable_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// The clock used for sleeps and elapsed time measurement.
    #[must_use]
    pub fn get_clock(&self) -> &Clock {
        &self.clock
    }

    /// The pipeline name.
    #[must_use]
    pub fn get_name(&self) -> &str {
        &self.name
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, reason = "unused when logs nor metrics are used")
    )]
    pub(crate) fn create_telemetry(&self, operation_name: Cow<'static, str>) -> crate::utils::TelemetryHelper {
        crate::utils::TelemetryHelper {
            #[cfg(any(feature = "metrics", test))]
            event_reporter: self.meter.as_ref().map(crate::telemetry::metrics::create_event_counter),
            #[cfg(any(feature = "metrics", feature = "logs", test))]
            pipeline_name: self.name.clone(),
            #[cfg(any(feature = "metrics", feature = "logs", test))]
            operation_name,
            #[cfg(any(feature = "logs", test))]
            logs_enabled: self.logs_enabled,
        }
    }
}
