//! Process-wide Prometheus recorder.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Failure to install the recorder.
#[derive(Debug, thiserror::Error)]
#[error("unable to install the metrics recorder")]
pub struct MetricsError(#[from] BuildError);

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Must be called at most once per process. The returned handle renders
/// the current exposition text.
///
/// # Errors
///
/// Returns [`MetricsError`] if a recorder is already installed.
pub fn install() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::debug!("prometheus recorder installed");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_refuse_second_installation() {
        crate::test_handle();
        assert!(install().is_err());
    }
}
