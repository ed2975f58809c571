//! Target state — the user-desired configuration of a device.
//!
//! Input is always a [`TargetStatePatch`] (every field optional); output is
//! always a complete [`TargetState`], with missing fields materialized from
//! [`TargetDefaults`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// Desired operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Off,
    Heat,
    Cool,
    Auto,
}

impl Mode {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 4] = [Self::Off, Self::Heat, Self::Cool, Self::Auto];

    /// Wire representation (`OFF`, `HEAT`, …).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
            Self::Auto => "AUTO",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string did not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must be one of [{expected}], got: {got:?}")]
pub struct ParseVariantError {
    pub kind: &'static str,
    pub expected: &'static str,
    pub got: String,
}

impl FromStr for Mode {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ParseVariantError {
                kind: "mode",
                expected: "OFF, HEAT, COOL, AUTO",
                got: s.to_string(),
            })
    }
}

/// Complete desired configuration of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetState {
    #[serde(rename = "deviceID", alias = "deviceId")]
    pub device_id: DeviceId,
    pub mode: Mode,
    pub target_temperature: i32,
}

/// Partial update of a [`TargetState`]. Absent fields leave stored values untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetStatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<i32>,
}

impl TargetStatePatch {
    /// Whether the patch carries no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.target_temperature.is_none()
    }

    /// Overlay `other` on top of `self`: fields present in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            mode: other.mode.or(self.mode),
            target_temperature: other.target_temperature.or(self.target_temperature),
        }
    }

    /// The defaults for exactly the fields this patch is missing.
    #[must_use]
    pub fn missing_from(&self, defaults: &TargetDefaults) -> Self {
        Self {
            mode: self.mode.is_none().then_some(defaults.mode),
            target_temperature: self
                .target_temperature
                .is_none()
                .then_some(defaults.target_temperature),
        }
    }

    /// Build a complete state, taking absent fields from `defaults`.
    #[must_use]
    pub fn with_defaults(self, device_id: DeviceId, defaults: &TargetDefaults) -> TargetState {
        TargetState {
            device_id,
            mode: self.mode.unwrap_or(defaults.mode),
            target_temperature: self
                .target_temperature
                .unwrap_or(defaults.target_temperature),
        }
    }
}

/// Process-wide defaults materialized the first time a device's target state is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TargetDefaults {
    pub mode: Mode,
    pub target_temperature: i32,
}

impl Default for TargetDefaults {
    fn default() -> Self {
        Self {
            mode: Mode::Off,
            target_temperature: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_uppercase_wire_names_for_mode() {
        assert_eq!(serde_json::to_string(&Mode::Heat).unwrap(), "\"HEAT\"");
        let parsed: Mode = serde_json::from_str("\"AUTO\"").unwrap();
        assert_eq!(parsed, Mode::Auto);
    }

    #[test]
    fn should_reject_unknown_mode() {
        assert!(serde_json::from_str::<Mode>("\"TURBO\"").is_err());
        let err = Mode::from_str("heat").unwrap_err();
        assert_eq!(err.got, "heat");
    }

    #[test]
    fn should_parse_every_mode_from_its_display() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn should_decode_partial_patch() {
        let patch: TargetStatePatch = serde_json::from_str(r#"{"mode":"COOL"}"#).unwrap();
        assert_eq!(patch.mode, Some(Mode::Cool));
        assert_eq!(patch.target_temperature, None);
    }

    #[test]
    fn should_ignore_device_id_in_patch_body() {
        let patch: TargetStatePatch =
            serde_json::from_str(r#"{"deviceID":"other","targetTemperature":18}"#).unwrap();
        assert_eq!(patch.target_temperature, Some(18));
    }

    #[test]
    fn should_merge_disjoint_fields_in_either_order() {
        let heat = TargetStatePatch {
            mode: Some(Mode::Heat),
            ..TargetStatePatch::default()
        };
        let twenty = TargetStatePatch {
            target_temperature: Some(20),
            ..TargetStatePatch::default()
        };
        assert_eq!(heat.merge(twenty), twenty.merge(heat));
    }

    #[test]
    fn should_only_default_missing_fields() {
        let defaults = TargetDefaults::default();
        let patch = TargetStatePatch {
            mode: Some(Mode::Cool),
            target_temperature: None,
        };
        let missing = patch.missing_from(&defaults);
        assert_eq!(missing.mode, None);
        assert_eq!(missing.target_temperature, Some(20));

        let state = patch.with_defaults(DeviceId::from("d1"), &defaults);
        assert_eq!(state.mode, Mode::Cool);
        assert_eq!(state.target_temperature, 20);
    }

    #[test]
    fn should_serialize_full_state_with_device_id_key() {
        let state = TargetState {
            device_id: DeviceId::from("D1"),
            mode: Mode::Auto,
            target_temperature: 20,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"deviceID": "D1", "mode": "AUTO", "targetTemperature": 20})
        );
    }
}
