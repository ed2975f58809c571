//! In-process device channel backed by tokio mpsc queues.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use thermotwin_domain::error::TwinError;

use crate::ports::{MessagePublisher, MessageSubscriber, Subscription};

/// In-process channel routing published payloads to subscribers of the
/// exact same topic.
///
/// Publishing succeeds even when nobody listens on the topic
/// (the payload is simply dropped), mirroring a broker without retained
/// messages.
pub struct InMemoryChannel {
    capacity: usize,
    topics: Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>,
}

impl InMemoryChannel {
    /// Create a new channel; each subscription buffers up to `capacity` payloads.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Mutex::new(HashMap::new()),
        }
    }

    fn senders(&self, topic: &str) -> Vec<mpsc::Sender<Vec<u8>>> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        match topics.get_mut(topic) {
            Some(senders) => {
                senders.retain(|sender| !sender.is_closed());
                senders.clone()
            }
            None => Vec::new(),
        }
    }
}

impl MessagePublisher for InMemoryChannel {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        let senders = self.senders(topic);
        async move {
            for sender in senders {
                // a subscriber dropping between lookup and send is not an error
                let _ = sender.send(payload.clone()).await;
            }
            Ok(())
        }
    }
}

impl MessageSubscriber for InMemoryChannel {
    fn subscribe(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Subscription, TwinError>> + Send {
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_default()
            .push(sender);
        async { Ok(receiver) }
    }
}
