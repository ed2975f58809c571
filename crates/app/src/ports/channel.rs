//! Channel port — publish/subscribe towards devices.
//!
//! The channel offers at-least-once delivery with no ordering guarantee.
//! Implementations must tolerate concurrent `publish` and `subscribe` calls
//! from many tasks.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use thermotwin_domain::error::TwinError;

/// Stream of raw payloads received on one topic.
///
/// The stream ends when the channel client shuts down.
pub type Subscription = mpsc::Receiver<Vec<u8>>;

/// Sends payloads to devices.
pub trait MessagePublisher {
    /// Publish `payload` on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TwinError>> + Send;
}

/// Receives payloads from devices.
pub trait MessageSubscriber {
    /// Start receiving every message published on `topic`.
    fn subscribe(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Subscription, TwinError>> + Send;
}

impl<T: MessagePublisher + Send + Sync> MessagePublisher for Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        (**self).publish(topic, payload)
    }
}

impl<T: MessageSubscriber + Send + Sync> MessageSubscriber for Arc<T> {
    fn subscribe(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Subscription, TwinError>> + Send {
        (**self).subscribe(topic)
    }
}
