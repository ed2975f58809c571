//! # thermotwin-adapter-metrics-prometheus
//!
//! Telemetry adapter built on the [metrics](https://docs.rs/metrics) facade
//! with a Prometheus recorder.
//!
//! ## Responsibilities
//! - Implement the `TwinTelemetry` port from `thermotwin-app`
//! - Install the process-wide recorder once at startup
//! - Render the text exposition served on `/metrics`
//!
//! ## Dependency rule
//! Depends on `thermotwin-app` and `thermotwin-domain` only.

pub mod recorder;
pub mod telemetry;

pub use recorder::{MetricsError, install};
pub use telemetry::PrometheusTelemetry;

#[cfg(test)]
pub(crate) fn test_handle() -> &'static metrics_exporter_prometheus::PrometheusHandle {
    static HANDLE: std::sync::OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
        std::sync::OnceLock::new();
    HANDLE.get_or_init(|| install().unwrap())
}
