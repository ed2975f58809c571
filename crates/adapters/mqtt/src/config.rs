//! MQTT channel configuration.

use std::time::Duration;

use rumqttc::QoS;
use serde::Deserialize;

/// Configuration for the MQTT channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Optional broker username.
    pub username: Option<String>,
    /// Optional broker password, only used together with `username`.
    pub password: Option<String>,
    /// Quality of service for publishes and subscriptions (0, 1 or 2).
    pub qos: u8,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    /// How long to wait for the broker to acknowledge the connection, in seconds.
    pub connection_timeout_secs: u64,
    /// Topics carrying device reports.
    pub inbound_topics: Vec<String>,
    /// Topic target states are published on.
    pub outbound_topic: String,
    /// Payloads buffered per subscription. Once full, the event loop waits
    /// for the subscriber and stops reading from the broker until it catches up.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "thermotwin".to_string(),
            username: None,
            password: None,
            qos: 1,
            keep_alive_secs: 30,
            connection_timeout_secs: 10,
            inbound_topics: vec!["thermostat/current-state".to_string()],
            outbound_topic: "thermostat/set/target-state".to_string(),
            channel_capacity: 64,
        }
    }
}

impl MqttConfig {
    /// Map the numeric level to a [`QoS`]; anything above 2 is clamped.
    #[must_use]
    pub fn qos(&self) -> QoS {
        match self.qos {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        }
    }

    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}
