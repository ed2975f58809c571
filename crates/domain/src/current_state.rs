//! Current state — the device-reported condition.
//!
//! Only devices write current state, one full report at a time. A device
//! has no current state until its first report is accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;
use crate::target_state::ParseVariantError;
use crate::time::Timestamp;

/// What the device is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatingState {
    Idle,
    Heating,
    Cooling,
}

impl OperatingState {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 3] = [Self::Idle, Self::Heating, Self::Cooling];

    /// Wire representation (`IDLE`, `HEATING`, `COOLING`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Heating => "HEATING",
            Self::Cooling => "COOLING",
        }
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingState {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseVariantError {
                kind: "operating state",
                expected: "IDLE, HEATING, COOLING",
                got: s.to_string(),
            })
    }
}

/// A full device report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    #[serde(rename = "deviceID", alias = "deviceId")]
    pub device_id: DeviceId,
    /// When the reading was taken at the device.
    pub timestamp: Timestamp,
    pub operating_state: OperatingState,
    pub current_temperature: f64,
    /// Not every device has a humidity sensor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_humidity: Option<f64>,
}

impl CurrentState {
    /// Whether this report was taken strictly before `other`.
    #[must_use]
    pub fn is_older_than(&self, other: &Self) -> bool {
        self.timestamp < other.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn report(ts: Timestamp) -> CurrentState {
        CurrentState {
            device_id: DeviceId::from("d1"),
            timestamp: ts,
            operating_state: OperatingState::Idle,
            current_temperature: 21.5,
            current_humidity: None,
        }
    }

    #[test]
    fn should_decode_report_without_humidity() {
        let json = r#"{
            "deviceID": "d1",
            "timestamp": "2024-05-01T10:00:00Z",
            "operatingState": "HEATING",
            "currentTemperature": 18.8
        }"#;
        let state: CurrentState = serde_json::from_str(json).unwrap();
        assert_eq!(state.device_id.as_str(), "d1");
        assert_eq!(state.operating_state, OperatingState::Heating);
        assert!(state.current_humidity.is_none());
    }

    #[test]
    fn should_accept_lowercase_device_id_key() {
        let json = r#"{
            "deviceId": "d2",
            "timestamp": "2024-05-01T10:00:00.123456789Z",
            "operatingState": "COOLING",
            "currentTemperature": 30.0,
            "currentHumidity": 45.2
        }"#;
        let state: CurrentState = serde_json::from_str(json).unwrap();
        assert_eq!(state.device_id.as_str(), "d2");
        assert_eq!(state.current_humidity, Some(45.2));
    }

    #[test]
    fn should_reject_unknown_operating_state() {
        let json = r#"{
            "deviceID": "d1",
            "timestamp": "2024-05-01T10:00:00Z",
            "operatingState": "DEFROSTING",
            "currentTemperature": 1.0
        }"#;
        assert!(serde_json::from_str::<CurrentState>(json).is_err());
    }

    #[test]
    fn should_compare_by_timestamp_strictly() {
        let older = report(at(0));
        let newer = report(at(1));
        assert!(older.is_older_than(&newer));
        assert!(!newer.is_older_than(&older));
        assert!(!older.is_older_than(&report(at(0))));
    }

    #[test]
    fn should_parse_operating_state_from_display() {
        for state in OperatingState::ALL {
            assert_eq!(state.to_string().parse::<OperatingState>().unwrap(), state);
        }
        assert!("idle".parse::<OperatingState>().is_err());
    }

    #[test]
    fn should_preserve_subsecond_precision_in_json() {
        let state = report(at(0) + Duration::nanoseconds(123_456_789));
        let json = serde_json::to_string(&state).unwrap();
        let parsed: CurrentState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.timestamp, state.timestamp);
    }
}
