//! MQTT-backed device channel.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::{mpsc, oneshot};

use thermotwin_app::ports::{MessagePublisher, MessageSubscriber, Subscription};
use thermotwin_domain::error::TwinError;

use crate::config::MqttConfig;
use crate::error::MqttError;

/// Pause before polling again after a connection error; rumqttc reconnects
/// on the next poll.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

type Routes = HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>;

struct Inner {
    client: AsyncClient,
    qos: QoS,
    capacity: usize,
    routes: Mutex<Routes>,
    closing: AtomicBool,
}

/// Shared MQTT connection implementing both channel ports.
///
/// Cloning is cheap and every clone talks through the same connection.
#[derive(Clone)]
pub struct MqttChannel {
    inner: Arc<Inner>,
}

impl MqttChannel {
    /// Connect to the broker and wait for it to acknowledge the session.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Connection`] if the broker is unreachable or
    /// refuses the session, and [`MqttError::Timeout`] if no acknowledgement
    /// arrives within the configured timeout.
    pub async fn connect(config: &MqttConfig) -> Result<Self, MqttError> {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(true);
        if let Some(username) = &config.username {
            options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
        }

        let (client, event_loop) = AsyncClient::new(options, 10);
        let channel = Self::from_client(client, config.qos(), config.channel_capacity);

        let (connack_tx, connack_rx) = oneshot::channel();
        tokio::spawn(handle_events(event_loop, channel.clone(), connack_tx));

        let timeout = config.connection_timeout();
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    host = %config.broker_host,
                    port = config.broker_port,
                    client_id = %config.client_id,
                    "connected to MQTT broker"
                );
                Ok(channel)
            }
            Ok(Ok(Err(err))) => {
                channel.inner.closing.store(true, Ordering::Release);
                Err(err)
            }
            Ok(Err(_)) => Err(MqttError::Connection(
                "event loop terminated unexpectedly".to_string(),
            )),
            Err(_) => {
                channel.inner.closing.store(true, Ordering::Release);
                Err(MqttError::Timeout(timeout.as_secs()))
            }
        }
    }

    fn from_client(client: AsyncClient, qos: QoS, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                qos,
                capacity,
                routes: Mutex::new(HashMap::new()),
                closing: AtomicBool::new(false),
            }),
        }
    }

    /// Close the connection. Open subscriptions end once the event loop stops.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the event loop is already gone.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        tracing::info!("disconnecting from MQTT broker");
        self.inner.closing.store(true, Ordering::Release);
        self.routes().clear();
        self.inner
            .client
            .disconnect()
            .await
            .map_err(MqttError::Client)
    }

    fn routes(&self) -> std::sync::MutexGuard<'_, Routes> {
        self.inner
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver an inbound payload to every subscription of `topic`.
    ///
    /// A full subscription queue makes this wait, which pauses the event loop
    /// and with it reads from the broker, acknowledgements and keep-alives.
    /// Messages are never dropped here; size `channel_capacity` for bursts.
    async fn route(&self, topic: &str, payload: Vec<u8>) {
        let senders = {
            let mut routes = self.routes();
            match routes.get_mut(topic) {
                Some(senders) => {
                    senders.retain(|sender| !sender.is_closed());
                    senders.clone()
                }
                None => Vec::new(),
            }
        };
        if senders.is_empty() {
            tracing::debug!(%topic, "dropping message without subscriber");
            return;
        }
        for sender in senders {
            match sender.try_send(payload.clone()) {
                Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
                Err(mpsc::error::TrySendError::Full(payload)) => {
                    tracing::warn!(%topic, "ingestion queue full, pausing MQTT event loop");
                    // a subscriber dropping while we wait is not an error
                    let _ = sender.send(payload).await;
                }
            }
        }
    }

    /// Queue a subscription for every known topic, after a (re)connection.
    fn resubscribe(&self) {
        let topics: Vec<String> = self.routes().keys().cloned().collect();
        for topic in topics {
            if let Err(err) = self.inner.client.try_subscribe(topic.clone(), self.inner.qos) {
                tracing::warn!(%topic, error = %err, "unable to resubscribe");
            }
        }
    }
}

impl MessagePublisher for MqttChannel {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        let inner = Arc::clone(&self.inner);
        let topic = topic.to_string();
        async move {
            inner
                .client
                .publish(topic, inner.qos, false, payload)
                .await
                .map_err(MqttError::Client)?;
            Ok(())
        }
    }
}

impl MessageSubscriber for MqttChannel {
    fn subscribe(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Subscription, TwinError>> + Send {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        self.routes()
            .entry(topic.to_string())
            .or_default()
            .push(sender);
        let inner = Arc::clone(&self.inner);
        let topic = topic.to_string();
        async move {
            inner
                .client
                .subscribe(topic.clone(), inner.qos)
                .await
                .map_err(MqttError::Client)?;
            tracing::debug!(%topic, "subscribed");
            Ok(receiver)
        }
    }
}

async fn handle_events(
    mut event_loop: EventLoop,
    channel: MqttChannel,
    connack_tx: oneshot::Sender<Result<(), MqttError>>,
) {
    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT session acknowledged");
                match connack_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(Ok(()));
                    }
                    None => channel.resubscribe(),
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::trace!(
                    topic = %publish.topic,
                    size = publish.payload.len(),
                    "MQTT message received"
                );
                channel.route(&publish.topic, publish.payload.to_vec()).await;
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker closed the session");
            }
            Ok(_) => {}
            Err(err) => {
                if channel.inner.closing.load(Ordering::Acquire) {
                    break;
                }
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Err(MqttError::Connection(err.to_string())));
                    break;
                }
                tracing::error!(error = %err, "MQTT connection lost, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }

    channel.routes().clear();
    tracing::info!("MQTT event loop stopped");
}
