//! Event ingestion pipeline.
//!
//! Inbound payloads flow through a chain of [`Middleware`] composed around a
//! base [`Handler`] at setup time. A [`Processor`] runs one long-lived task
//! per subscribed topic; a failing message never stops its task.
//!
//! Per message: `Decoding` → `Validating` → `Reconciling` → `Persisting`.
//! Any stage may fail, which drops that message only.

pub mod handler;
pub mod middleware;
pub mod processor;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thermotwin_domain::error::TwinError;

pub use processor::{Processor, ProcessorError};

/// Future returned by a [`Handler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), IngestError>> + Send>>;

/// Processes one raw payload.
pub type Handler = Arc<dyn Fn(Vec<u8>) -> HandlerFuture + Send + Sync>;

/// Wraps a handler for a given topic, returning the decorated handler.
pub type Middleware = Arc<dyn Fn(&str, Handler) -> Handler + Send + Sync>;

/// Pipeline stage a message failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    Validating,
    Reconciling,
    Persisting,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Decoding => "decoding",
            Self::Validating => "validating",
            Self::Reconciling => "reconciling",
            Self::Persisting => "persisting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single message was dropped.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unable to decode payload")]
    Decode(#[source] serde_json::Error),

    #[error("{stage} failed")]
    Twin {
        stage: Stage,
        #[source]
        source: TwinError,
    },
}

impl IngestError {
    pub(crate) fn at(stage: Stage) -> impl FnOnce(TwinError) -> Self {
        move |source| Self::Twin { stage, source }
    }

    /// Stage the message failed in.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Decode(_) => Stage::Decoding,
            Self::Twin { stage, .. } => *stage,
        }
    }

    /// Whether the message lost against a newer stored report.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Self::Twin {
                source: TwinError::Stale(_),
                ..
            }
        )
    }
}

/// Wrap `handler` in `middlewares`; the first middleware ends up outermost.
#[must_use]
pub fn compose(topic: &str, handler: Handler, middlewares: &[Middleware]) -> Handler {
    middlewares
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware(topic, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn tagging(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Middleware {
        Arc::new(move |_topic: &str, next: Handler| -> Handler {
            let log = Arc::clone(&log);
            Arc::new(move |payload: Vec<u8>| -> HandlerFuture {
                log.lock().unwrap().push(tag);
                next(payload)
            })
        })
    }

    #[tokio::test]
    async fn should_run_first_middleware_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let base_log = Arc::clone(&log);
        let base: Handler = Arc::new(move |_payload: Vec<u8>| -> HandlerFuture {
            base_log.lock().unwrap().push("handler");
            Box::pin(async { Ok(()) })
        });

        let composed = compose(
            "t",
            base,
            &[
                tagging("outer", Arc::clone(&log)),
                tagging("inner", Arc::clone(&log)),
            ],
        );
        composed(Vec::new()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner", "handler"]);
    }

    #[test]
    fn should_report_stage_of_failure() {
        let decode = IngestError::Decode(serde_json::from_slice::<u8>(b"x").unwrap_err());
        assert_eq!(decode.stage(), Stage::Decoding);
        assert!(!decode.is_stale());

        let storage = IngestError::at(Stage::Persisting)(TwinError::storage(std::io::Error::other(
            "boom",
        )));
        assert_eq!(storage.stage(), Stage::Persisting);
        assert_eq!(storage.to_string(), "persisting failed");
    }
}
