//! MQTT adapter error types.

use thermotwin_domain::error::TwinError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client refused the request (its event loop is gone).
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The broker could not be reached or rejected the connection.
    #[error("MQTT connection failed: {0}")]
    Connection(String),

    /// The broker did not acknowledge the connection in time.
    #[error("MQTT connection timeout after {0}s")]
    Timeout(u64),
}

impl From<MqttError> for TwinError {
    fn from(err: MqttError) -> Self {
        Self::publish(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_timeout() {
        assert_eq!(
            MqttError::Timeout(10).to_string(),
            "MQTT connection timeout after 10s"
        );
    }

    #[test]
    fn should_convert_to_publish_error() {
        let err: TwinError = MqttError::Connection("refused".into()).into();
        assert!(matches!(err, TwinError::Publish(_)));
    }
}
