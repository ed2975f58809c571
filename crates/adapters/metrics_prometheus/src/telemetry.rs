//! [`TwinTelemetry`] on the `metrics` facade.

use std::time::Duration;

use metrics::{gauge, histogram, increment_counter};

use thermotwin_app::ports::{EventStatus, TwinTelemetry};
use thermotwin_domain::current_state::{CurrentState, OperatingState};
use thermotwin_domain::error::StaleReportError;
use thermotwin_domain::target_state::{Mode, TargetState};

pub const MODE: &str = "thermostat_mode";
pub const TARGET_TEMPERATURE: &str = "thermostat_target_temperature";
pub const OPERATING_STATE: &str = "thermostat_operating_state";
pub const CURRENT_TEMPERATURE: &str = "thermostat_current_temperature";
pub const CURRENT_HUMIDITY: &str = "thermostat_current_humidity";
pub const EVENTS_PROCESSED: &str = "events_processed";
pub const EVENTS_DURATION: &str = "events_duration_seconds";
pub const REPORTS_REJECTED: &str = "reports_rejected";
pub const REQUESTS_HANDLED: &str = "requests_handled";
pub const REQUESTS_DURATION: &str = "requests_duration_seconds";

/// Gauge encoding of [`Mode`].
#[must_use]
pub fn mode_value(mode: Mode) -> f64 {
    match mode {
        Mode::Off => 0.0,
        Mode::Heat => 1.0,
        Mode::Cool => 2.0,
        Mode::Auto => 3.0,
    }
}

/// Gauge encoding of [`OperatingState`].
#[must_use]
pub fn operating_state_value(state: OperatingState) -> f64 {
    match state {
        OperatingState::Idle => 0.0,
        OperatingState::Heating => 1.0,
        OperatingState::Cooling => 2.0,
    }
}

/// Records through whatever recorder is installed; a no-op until
/// [`install`](crate::install) runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusTelemetry;

impl TwinTelemetry for PrometheusTelemetry {
    fn target_state_changed(&self, state: &TargetState) {
        let device_id = state.device_id.to_string();
        gauge!(MODE, mode_value(state.mode), "device_id" => device_id.clone());
        gauge!(
            TARGET_TEMPERATURE,
            f64::from(state.target_temperature),
            "device_id" => device_id
        );
    }

    fn current_state_changed(&self, state: &CurrentState) {
        let device_id = state.device_id.to_string();
        gauge!(
            OPERATING_STATE,
            operating_state_value(state.operating_state),
            "device_id" => device_id.clone()
        );
        gauge!(
            CURRENT_TEMPERATURE,
            state.current_temperature,
            "device_id" => device_id.clone()
        );
        if let Some(humidity) = state.current_humidity {
            gauge!(CURRENT_HUMIDITY, humidity, "device_id" => device_id);
        }
    }

    fn event_processed(
        &self,
        topic: &str,
        device_id: &str,
        status: EventStatus,
        elapsed: Duration,
    ) {
        increment_counter!(
            EVENTS_PROCESSED,
            "event_name" => topic.to_string(),
            "status" => status.as_str(),
            "device_id" => device_id.to_string()
        );
        histogram!(
            EVENTS_DURATION,
            elapsed.as_secs_f64(),
            "event_name" => topic.to_string(),
            "status" => status.as_str(),
            "device_id" => device_id.to_string()
        );
    }

    fn report_rejected(&self, rejection: &StaleReportError) {
        increment_counter!(
            REPORTS_REJECTED,
            "device_id" => rejection.device_id.to_string(),
            "reason" => "stale"
        );
    }

    fn request_handled(&self, route: &str, status_code: u16, elapsed: Duration) {
        increment_counter!(
            REQUESTS_HANDLED,
            "route_name" => route.to_string(),
            "status_code" => status_code.to_string()
        );
        histogram!(
            REQUESTS_DURATION,
            elapsed.as_secs_f64(),
            "route_name" => route.to_string()
        );
    }
}
