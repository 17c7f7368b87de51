//! Request metrics plugin using the metrics crate facade.
//!
//! Records call metrics through the `metrics` crate, which allows
//! integration with various backends (Prometheus, `StatsD`, etc.).

use async_trait::async_trait;
use courier_core::Error;

use crate::context::Snapshot;
use crate::plugin::ObserverPlugin;

/// Labels used for metrics.
const LABEL_METHOD: &str = "method";
const LABEL_STATUS: &str = "status";
const LABEL_CLASS: &str = "class";

/// Metric names.
const METRIC_REQUESTS_TOTAL: &str = "courier_requests_total";
const METRIC_REQUEST_DURATION: &str = "courier_request_duration_seconds";
const METRIC_REQUEST_FAILURES: &str = "courier_request_failures_total";
const METRIC_REQUESTS_IN_FLIGHT: &str = "courier_requests_in_flight";

/// Observer plugin that records call metrics.
///
/// Records the following metrics:
/// - `courier_requests_total` (counter): completed calls, labeled by method and status
/// - `courier_request_duration_seconds` (histogram): call duration, labeled by method
/// - `courier_request_failures_total` (counter): terminal failures, labeled by method and error class
/// - `courier_requests_in_flight` (gauge): calls currently in flight
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestMetrics {
    _private: (),
}

impl RequestMetrics {
    /// Create a new metrics plugin.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

fn error_class(error: &Error) -> &'static str {
    if error.is_decode() {
        "decode"
    } else if error.is_build() {
        "build"
    } else {
        "transport"
    }
}

#[async_trait]
impl ObserverPlugin for RequestMetrics {
    async fn will_send(&self, _snapshot: &Snapshot) {
        metrics::gauge!(METRIC_REQUESTS_IN_FLIGHT).increment(1.0);
    }

    async fn did_receive(&self, snapshot: &Snapshot) {
        metrics::gauge!(METRIC_REQUESTS_IN_FLIGHT).decrement(1.0);

        let method = snapshot.spec().method().to_string();
        let duration = snapshot.start_time().elapsed().as_secs_f64();
        metrics::histogram!(METRIC_REQUEST_DURATION, LABEL_METHOD => method.clone())
            .record(duration);

        let status = snapshot
            .response()
            .map_or_else(|| "unknown".to_string(), |r| r.status().to_string());
        metrics::counter!(
            METRIC_REQUESTS_TOTAL,
            LABEL_METHOD => method,
            LABEL_STATUS => status
        )
        .increment(1);
    }

    async fn did_fail(&self, snapshot: &Snapshot) {
        // A decode failure arrives after a `did_receive` that already
        // settled the gauge and duration for this call.
        if snapshot.response().is_none() {
            metrics::gauge!(METRIC_REQUESTS_IN_FLIGHT).decrement(1.0);

            let method = snapshot.spec().method().to_string();
            let duration = snapshot.start_time().elapsed().as_secs_f64();
            metrics::histogram!(METRIC_REQUEST_DURATION, LABEL_METHOD => method)
                .record(duration);
        }

        let method = snapshot.spec().method().to_string();
        let class = snapshot.error().map_or("unknown", error_class);
        metrics::counter!(
            METRIC_REQUEST_FAILURES,
            LABEL_METHOD => method,
            LABEL_CLASS => class
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes() {
        assert_eq!(error_class(&Error::build("bad path")), "build");
        assert_eq!(error_class(&Error::Timeout), "transport");
        assert_eq!(error_class(&Error::decode("$", "oops")), "decode");
    }

    #[test]
    #[allow(clippy::no_effect_underscore_binding)]
    fn metrics_plugin_copy() {
        let plugin = RequestMetrics::new();
        let _copied = plugin;
        // Verify it was copied, not moved
        let _another = plugin;
    }
}
