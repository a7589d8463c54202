// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Telemetry handles bound to one named operation.
#[derive(Debug, Clone)]
pub(crate) struct TelemetryHelper {
    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub(crate) pipeline_name: std::borrow::Cow<'static, str>,
    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub(crate) operation_name: std::borrow::Cow<'static, str>,
    #[cfg(any(feature = "metrics", test))]
    pub(crate) event_reporter: Option<opentelemetry::metrics::Counter<u64>>,
    #[cfg(any(feature = "logs", test))]
    pub(crate) logs_enabled: bool,
}

impl TelemetryHelper {
    /// Returns a copy that reports under a different operation name.
    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, reason = "unused when logs nor metrics are used")
    )]
    #[must_use]
    pub(crate) fn for_operation(&self, operation_name: std::borrow::Cow<'static, str>) -> Self {
        Self {
            #[cfg(any(feature = "metrics", feature = "logs", test))]
            operation_name,
            ..self.clone()
        }
    }

    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn metrics_enabled(&self) -> bool {
        self.event_reporter.is_some()
    }

    /// Increments the event counter with the pipeline, operation and event attributes
    /// followed by `extra`.
    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn report_event(&self, event_name: &'static str, extra: &[opentelemetry::KeyValue]) {
        use opentelemetry::KeyValue;

        use crate::telemetry::{EVENT_NAME, OPERATION_NAME, PIPELINE_NAME};

        if let Some(reporter) = &self.event_reporter {
            let mut attributes = Vec::with_capacity(3 + extra.len());
            attributes.push(KeyValue::new(PIPELINE_NAME, self.pipeline_name.clone()));
            attributes.push(KeyValue::new(OPERATION_NAME, self.operation_name.clone()));
            attributes.push(KeyValue::new(EVENT_NAME, event_name));
            attributes.extend_from_slice(extra);

            reporter.add(1, &attributes);
        }
    }
}
