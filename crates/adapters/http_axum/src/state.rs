//! Shared application state for axum handlers.

use std::sync::Arc;

use thermotwin_app::ports::{
    CurrentStateRepository, MessagePublisher, TargetStateRepository, TwinTelemetry,
};
use thermotwin_app::services::twin_service::TwinService;

/// Renders the metrics exposition served on `/metrics`.
pub type MetricsRenderer = Arc<dyn Fn() -> String + Send + Sync>;

/// Application state shared across all axum handlers.
///
/// Generic over the repository and publisher types to avoid dynamic dispatch
/// on the hot path. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<TR, CR, P> {
    /// Reads and target-state updates.
    pub twin_service: Arc<TwinService<TR, CR, P>>,
    /// Receives one event per answered request.
    pub telemetry: Arc<dyn TwinTelemetry>,
    /// `/metrics` is only served when set.
    pub metrics: Option<MetricsRenderer>,
}

impl<TR, CR, P> Clone for AppState<TR, CR, P> {
    fn clone(&self) -> Self {
        Self {
            twin_service: Arc::clone(&self.twin_service),
            telemetry: Arc::clone(&self.telemetry),
            metrics: self.metrics.clone(),
        }
    }
}

impl<TR, CR, P> AppState<TR, CR, P>
where
    TR: TargetStateRepository + Send + Sync + 'static,
    CR: CurrentStateRepository + Send + Sync + 'static,
    P: MessagePublisher + Send + Sync + 'static,
{
    /// Create a new application state from a shared service.
    pub fn new(
        twin_service: Arc<TwinService<TR, CR, P>>,
        telemetry: Arc<dyn TwinTelemetry>,
    ) -> Self {
        Self {
            twin_service,
            telemetry,
            metrics: None,
        }
    }

    /// Serve `/metrics` using `renderer`.
    #[must_use]
    pub fn with_metrics(mut self, renderer: MetricsRenderer) -> Self {
        self.metrics = Some(renderer);
        self
    }
}
