//! # thermotwin-adapter-mqtt
//!
//! MQTT adapter — the device channel on top of [rumqttc](https://docs.rs/rumqttc).
//!
//! ## Responsibilities
//! - Connect to an MQTT broker and fail fast if it cannot be reached
//! - Implement `MessagePublisher` / `MessageSubscriber` from `thermotwin-app`
//! - Route inbound publishes to per-topic queues by exact topic name
//! - Re-subscribe every known topic after the client reconnects
//!
//! Delivery is at-least-once at QoS 1 (the default); ordering is not
//! guaranteed and duplicates are absorbed by the reconciler.
//!
//! ## Dependency rule
//! Same as other adapters: depends on `thermotwin-app` and `thermotwin-domain`.

pub mod channel;
pub mod config;
pub mod error;

pub use channel::MqttChannel;
pub use config::MqttConfig;
pub use error::MqttError;
