//! Validation rules for both halves of the twin.
//!
//! Pure functions: they never mutate their input and report the first
//! violated constraint. The HTTP path and the ingestion path call the same
//! functions so both apply an identical rule set.

use std::ops::RangeInclusive;

use chrono::Duration;

use crate::current_state::CurrentState;
use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::target_state::{TargetDefaults, TargetState, TargetStatePatch};
use crate::time::{Timestamp, age};

/// Accepted `targetTemperature` values.
pub const TARGET_TEMPERATURE_RANGE: RangeInclusive<i32> = 0..=25;

/// Accepted `currentTemperature` values.
pub const CURRENT_TEMPERATURE_RANGE: RangeInclusive<f64> = -55.0..=125.0;

/// Accepted `currentHumidity` values.
pub const CURRENT_HUMIDITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Oldest report accepted, relative to processing time.
pub const MAX_REPORT_AGE_SECS: i64 = 60 * 60;

/// Reject empty or whitespace-only identifiers.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyDeviceId`].
pub fn validate_device_id(id: &DeviceId) -> Result<(), ValidationError> {
    if id.is_blank() {
        return Err(ValidationError::EmptyDeviceId);
    }
    Ok(())
}

/// Check a target temperature against [`TARGET_TEMPERATURE_RANGE`].
///
/// # Errors
///
/// Returns [`ValidationError::TargetTemperatureOutOfRange`].
pub fn validate_target_temperature(value: i32) -> Result<(), ValidationError> {
    if !TARGET_TEMPERATURE_RANGE.contains(&value) {
        return Err(ValidationError::TargetTemperatureOutOfRange {
            value,
            min: *TARGET_TEMPERATURE_RANGE.start(),
            max: *TARGET_TEMPERATURE_RANGE.end(),
        });
    }
    Ok(())
}

/// Validate the fields present in a partial target update.
///
/// `mode` needs no check here: unknown modes never survive decoding.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn validate_target_patch(patch: &TargetStatePatch) -> Result<(), ValidationError> {
    if let Some(value) = patch.target_temperature {
        validate_target_temperature(value)?;
    }
    Ok(())
}

/// Validate a complete target state.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn validate_target(state: &TargetState) -> Result<(), ValidationError> {
    validate_device_id(&state.device_id)?;
    validate_target_temperature(state.target_temperature)
}

/// Validate configured defaults so a bad config cannot materialize invalid state.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn validate_defaults(defaults: &TargetDefaults) -> Result<(), ValidationError> {
    validate_target_temperature(defaults.target_temperature)
}

/// Validate identity and value ranges of a report, ignoring its age.
///
/// Used on data read back from storage, where a device that stopped
/// reporting still has a perfectly valid last reading.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn validate_current_fields(state: &CurrentState) -> Result<(), ValidationError> {
    validate_device_id(&state.device_id)?;

    if !CURRENT_TEMPERATURE_RANGE.contains(&state.current_temperature) {
        return Err(ValidationError::CurrentTemperatureOutOfRange {
            value: state.current_temperature,
            min: *CURRENT_TEMPERATURE_RANGE.start(),
            max: *CURRENT_TEMPERATURE_RANGE.end(),
        });
    }

    if let Some(humidity) = state.current_humidity
        && !CURRENT_HUMIDITY_RANGE.contains(&humidity)
    {
        return Err(ValidationError::CurrentHumidityOutOfRange {
            value: humidity,
            min: *CURRENT_HUMIDITY_RANGE.start(),
            max: *CURRENT_HUMIDITY_RANGE.end(),
        });
    }

    Ok(())
}

/// Validate an inbound report as of `now`, including the recency rule.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn validate_current(state: &CurrentState, now: Timestamp) -> Result<(), ValidationError> {
    validate_current_fields(state)?;

    if age(state.timestamp, now) > Duration::seconds(MAX_REPORT_AGE_SECS) {
        return Err(ValidationError::TimestampTooOld {
            timestamp: state.timestamp,
            max_age_secs: MAX_REPORT_AGE_SECS,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::current_state::OperatingState;
    use crate::target_state::Mode;
    use crate::time::now;

    fn report(now: Timestamp) -> CurrentState {
        CurrentState {
            device_id: DeviceId::from("d1"),
            timestamp: now - Duration::minutes(5),
            operating_state: OperatingState::Cooling,
            current_temperature: 22.5,
            current_humidity: Some(45.2),
        }
    }

    #[test]
    fn should_accept_target_temperature_at_upper_bound() {
        let patch = TargetStatePatch {
            target_temperature: Some(25),
            ..TargetStatePatch::default()
        };
        assert!(validate_target_patch(&patch).is_ok());
    }

    #[test]
    fn should_reject_target_temperature_above_range() {
        let patch = TargetStatePatch {
            target_temperature: Some(26),
            ..TargetStatePatch::default()
        };
        let err = validate_target_patch(&patch).unwrap_err();
        assert_eq!(err.field(), "targetTemperature");
    }

    #[test]
    fn should_reject_negative_target_temperature() {
        assert!(validate_target_temperature(-1).is_err());
        assert!(validate_target_temperature(0).is_ok());
    }

    #[test]
    fn should_accept_empty_patch() {
        assert!(validate_target_patch(&TargetStatePatch::default()).is_ok());
    }

    #[test]
    fn should_reject_full_target_with_blank_device_id() {
        let state = TargetState {
            device_id: DeviceId::from(" "),
            mode: Mode::Off,
            target_temperature: 20,
        };
        assert_eq!(
            validate_target(&state),
            Err(ValidationError::EmptyDeviceId)
        );
    }

    #[test]
    fn should_reject_defaults_out_of_range() {
        let defaults = TargetDefaults {
            mode: Mode::Off,
            target_temperature: 40,
        };
        assert!(validate_defaults(&defaults).is_err());
        assert!(validate_defaults(&TargetDefaults::default()).is_ok());
    }

    #[test]
    fn should_accept_valid_report() {
        let now = now();
        assert!(validate_current(&report(now), now).is_ok());
    }

    #[test]
    fn should_accept_humidity_at_upper_bound() {
        let now = now();
        let mut state = report(now);
        state.current_humidity = Some(100.0);
        assert!(validate_current(&state, now).is_ok());
    }

    #[test]
    fn should_reject_humidity_above_range() {
        let now = now();
        let mut state = report(now);
        state.current_humidity = Some(100.1);
        let err = validate_current(&state, now).unwrap_err();
        assert_eq!(err.field(), "currentHumidity");
    }

    #[test]
    fn should_accept_missing_humidity() {
        let now = now();
        let mut state = report(now);
        state.current_humidity = None;
        assert!(validate_current(&state, now).is_ok());
    }

    #[test]
    fn should_reject_temperature_outside_sensor_range() {
        let now = now();
        let mut state = report(now);
        state.current_temperature = -55.1;
        assert_eq!(
            validate_current(&state, now).unwrap_err().field(),
            "currentTemperature"
        );
        state.current_temperature = 125.0;
        assert!(validate_current(&state, now).is_ok());
    }

    #[test]
    fn should_reject_non_finite_temperature() {
        let now = now();
        let mut state = report(now);
        state.current_temperature = f64::NAN;
        assert!(validate_current(&state, now).is_err());
    }

    #[test]
    fn should_reject_report_older_than_one_hour() {
        let now = now();
        let mut state = report(now);
        state.timestamp = now - Duration::minutes(61);
        let err = validate_current(&state, now).unwrap_err();
        assert_eq!(err.field(), "timestamp");
    }

    #[test]
    fn should_accept_report_just_under_one_hour() {
        let now = now();
        let mut state = report(now);
        state.timestamp = now - Duration::minutes(59);
        assert!(validate_current(&state, now).is_ok());
    }

    #[test]
    fn should_accept_report_exactly_one_hour_old() {
        let now = now();
        let mut state = report(now);
        state.timestamp = now - Duration::hours(1);
        assert!(validate_current(&state, now).is_ok());
    }

    #[test]
    fn should_ignore_age_when_checking_fields_only() {
        let now = now();
        let mut state = report(now);
        state.timestamp = now - Duration::days(3);
        assert!(validate_current_fields(&state).is_ok());
        assert!(validate_current(&state, now).is_err());
    }

    #[test]
    fn should_reject_report_with_empty_device_id() {
        let now = now();
        let mut state = report(now);
        state.device_id = DeviceId::default();
        assert_eq!(
            validate_current(&state, now),
            Err(ValidationError::EmptyDeviceId)
        );
    }

    #[test]
    fn should_not_mutate_input() {
        let now = now();
        let state = report(now);
        let before = state.clone();
        let _ = validate_current(&state, now);
        assert_eq!(state, before);
    }
}
