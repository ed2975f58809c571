//! Long-lived ingestion tasks, one per subscribed topic.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use thermotwin_domain::error::TwinError;

use super::{Handler, IngestError, Middleware, compose};
use crate::ports::MessageSubscriber;

/// Failure to start or stop the processor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("unable to subscribe to {topic}")]
    Subscribe {
        topic: String,
        #[source]
        source: TwinError,
    },

    #[error("{pending} ingestion task(s) still running after the grace period")]
    GracePeriodElapsed { pending: usize },

    #[error("ingestion task failed")]
    Join(#[from] JoinError),
}

/// Routes inbound topics to handlers wrapped in a shared middleware chain.
pub struct Processor<S> {
    subscriber: S,
    middlewares: Vec<Middleware>,
    routes: Vec<(String, Handler)>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: MessageSubscriber> Processor<S> {
    pub fn new(subscriber: S) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            subscriber,
            middlewares: Vec::new(),
            routes: Vec::new(),
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Append a middleware applied to every route. The first one added runs outermost.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Handle every message received on `topic` with `handler`.
    #[must_use]
    pub fn route(mut self, topic: impl Into<String>, handler: Handler) -> Self {
        self.routes.push((topic.into(), handler));
        self
    }

    /// Topics this processor listens on.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(topic, _)| topic.as_str())
    }

    /// Subscribe every route and spawn its task.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Subscribe`] if a subscription fails. Tasks
    /// spawned for earlier routes keep running until [`stop`](Self::stop).
    pub async fn start(&mut self) -> Result<(), ProcessorError> {
        for (topic, handler) in std::mem::take(&mut self.routes) {
            let receiver = self
                .subscriber
                .subscribe(&topic)
                .await
                .map_err(|source| ProcessorError::Subscribe {
                    topic: topic.clone(),
                    source,
                })?;
            let handler = compose(&topic, handler, &self.middlewares);
            let shutdown = self.shutdown.subscribe();
            tracing::info!(%topic, "ingestion started");
            self.tasks
                .push(tokio::spawn(run(topic, receiver, handler, shutdown)));
        }
        Ok(())
    }

    /// Signal every task to stop and wait up to `grace` for in-flight and
    /// already queued messages to drain. Tasks still running afterwards are
    /// abandoned, not cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::GracePeriodElapsed`] when some tasks did not
    /// finish in time, or [`ProcessorError::Join`] if a task panicked.
    pub async fn stop(mut self, grace: Duration) -> Result<(), ProcessorError> {
        let _ = self.shutdown.send(true);
        let mut tasks = std::mem::take(&mut self.tasks);

        let drained = tokio::time::timeout(grace, async {
            for task in &mut tasks {
                task.await?;
            }
            Ok::<_, JoinError>(())
        })
        .await;

        match drained {
            Ok(result) => result.map_err(ProcessorError::from),
            Err(_) => Err(ProcessorError::GracePeriodElapsed {
                pending: tasks.iter().filter(|task| !task.is_finished()).count(),
            }),
        }
    }
}

async fn run(
    topic: String,
    mut receiver: tokio::sync::mpsc::Receiver<Vec<u8>>,
    handler: Handler,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut draining = false;
    loop {
        let payload = tokio::select! {
            biased;
            _ = shutdown.changed(), if !draining => {
                // refuse new messages but finish the ones already queued
                receiver.close();
                draining = true;
                tracing::debug!(%topic, "draining ingestion queue");
                continue;
            }
            received = receiver.recv() => match received {
                Some(payload) => payload,
                None => break,
            },
        };
        if let Err(err) = handler(payload).await {
            log_failure(&topic, &err);
        }
    }
    tracing::info!(%topic, "ingestion stopped");
}

fn log_failure(topic: &str, err: &IngestError) {
    let stage = err.stage();
    match err {
        IngestError::Twin {
            source: TwinError::Stale(rejection),
            ..
        } => tracing::info!(%topic, %stage, %rejection, "report dropped"),
        IngestError::Twin { source, .. } if !source.is_client_error() => {
            tracing::error!(%topic, %stage, error = ?source, "message processing failed");
        }
        other => {
            let cause = std::error::Error::source(other);
            tracing::warn!(%topic, %stage, error = %other, ?cause, "message rejected");
        }
    }
}
