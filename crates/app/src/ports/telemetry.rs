//! Telemetry port — observability hooks fired by the core.
//!
//! Only the triggering events live here; how they become gauges, counters or
//! histograms is up to the adapter.

use std::fmt;
use std::time::Duration;

use thermotwin_domain::current_state::CurrentState;
use thermotwin_domain::error::StaleReportError;
use thermotwin_domain::target_state::TargetState;

/// Outcome of processing one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Ok,
    Error,
}

impl EventStatus {
    /// Label value (`ok` / `error`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives observability events. Implementations must be cheap and never fail.
pub trait TwinTelemetry: Send + Sync {
    /// A target state was written (update or default materialization).
    fn target_state_changed(&self, state: &TargetState);

    /// A current state was written.
    fn current_state_changed(&self, state: &CurrentState);

    /// An inbound message finished processing on `topic`.
    fn event_processed(&self, topic: &str, device_id: &str, status: EventStatus, elapsed: Duration);

    /// A report was dropped because a newer one is already stored.
    fn report_rejected(&self, rejection: &StaleReportError);

    /// An HTTP request was answered.
    fn request_handled(&self, route: &str, status_code: u16, elapsed: Duration);
}

/// Telemetry sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TwinTelemetry for NoopTelemetry {
    fn target_state_changed(&self, _state: &TargetState) {}

    fn current_state_changed(&self, _state: &CurrentState) {}

    fn event_processed(
        &self,
        _topic: &str,
        _device_id: &str,
        _status: EventStatus,
        _elapsed: Duration,
    ) {
    }

    fn report_rejected(&self, _rejection: &StaleReportError) {}

    fn request_handled(&self, _route: &str, _status_code: u16, _elapsed: Duration) {}
}
