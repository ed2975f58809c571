//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`TwinError`]
//! via `From`. Adapter errors travel boxed inside [`TwinError::Storage`] or
//! [`TwinError::Publish`] so the domain never names an IO crate.

use std::error::Error as StdError;

use crate::id::DeviceId;
use crate::time::Timestamp;

/// Boxed source error coming from an adapter.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Top-level error shared by every layer.
#[derive(Debug, thiserror::Error)]
pub enum TwinError {
    /// Input violates a domain invariant. Always caller-caused.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The requested half of the twin does not exist yet.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An inbound report is older than the stored one.
    #[error("stale report")]
    Stale(#[from] StaleReportError),

    /// Persistence backend failure.
    #[error("storage error")]
    Storage(#[source] BoxError),

    /// Device channel failure (publish or subscribe).
    #[error("publish error")]
    Publish(#[source] BoxError),
}

impl TwinError {
    /// Wrap any error as a storage failure.
    pub fn storage(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }

    /// Wrap any error as a publish failure.
    pub fn publish(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Publish(Box::new(err))
    }

    /// Whether the error is deterministic and caused by the caller's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// A single violated constraint, naming the offending field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("deviceID cannot be empty")]
    EmptyDeviceId,

    #[error("targetTemperature must be in range [{min},{max}], got: {value}")]
    TargetTemperatureOutOfRange { value: i32, min: i32, max: i32 },

    #[error("currentTemperature must be in range [{min},{max}], got: {value:.2}")]
    CurrentTemperatureOutOfRange { value: f64, min: f64, max: f64 },

    #[error("currentHumidity must be in range [{min},{max}], got: {value:.2}")]
    CurrentHumidityOutOfRange { value: f64, min: f64, max: f64 },

    #[error("timestamp cannot be older than {max_age_secs}s, got: {timestamp}")]
    TimestampTooOld {
        timestamp: Timestamp,
        max_age_secs: i64,
    },
}

impl ValidationError {
    /// Name of the field that failed validation, as it appears on the wire.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyDeviceId => "deviceID",
            Self::TargetTemperatureOutOfRange { .. } => "targetTemperature",
            Self::CurrentTemperatureOutOfRange { .. } => "currentTemperature",
            Self::CurrentHumidityOutOfRange { .. } => "currentHumidity",
            Self::TimestampTooOld { .. } => "timestamp",
        }
    }
}

/// The requested record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found for device {device_id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub device_id: DeviceId,
}

/// An inbound report lost against a newer stored reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("report for device {device_id} at {reported} is older than stored reading at {stored}")]
pub struct StaleReportError {
    pub device_id: DeviceId,
    pub reported: Timestamp,
    pub stored: Timestamp,
}
