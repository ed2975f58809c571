//! Middleware applied around every ingestion handler.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::Instrument;

use thermotwin_domain::error::TwinError;

use super::{Handler, HandlerFuture, IngestError, Middleware};
use crate::ports::{EventStatus, TwinTelemetry};

/// Tag used when a payload carries no usable device identity.
pub const UNKNOWN_DEVICE: &str = "unknown";

#[derive(Deserialize)]
struct DeviceIdPeek {
    #[serde(rename = "deviceID", alias = "deviceId")]
    device_id: Option<String>,
}

/// Best-effort device identity extraction; never fails.
#[must_use]
pub fn device_id_of(payload: &[u8]) -> String {
    serde_json::from_slice::<DeviceIdPeek>(payload)
        .ok()
        .and_then(|peek| peek.device_id)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_DEVICE.to_string())
}

/// Record outcome status and latency of every message, tagged by topic and device.
#[must_use]
pub fn observe(telemetry: Arc<dyn TwinTelemetry>) -> Middleware {
    Arc::new(move |topic: &str, next: Handler| -> Handler {
        let telemetry = Arc::clone(&telemetry);
        let topic: Arc<str> = Arc::from(topic);
        Arc::new(move |payload: Vec<u8>| -> HandlerFuture {
            let telemetry = Arc::clone(&telemetry);
            let topic = Arc::clone(&topic);
            let next = Arc::clone(&next);
            Box::pin(async move {
                let device_id = device_id_of(&payload);
                let started = Instant::now();
                let result = next(payload).await;
                let status = if result.is_ok() {
                    EventStatus::Ok
                } else {
                    EventStatus::Error
                };
                telemetry.event_processed(&topic, &device_id, status, started.elapsed());
                if let Err(IngestError::Twin {
                    source: TwinError::Stale(rejection),
                    ..
                }) = &result
                {
                    telemetry.report_rejected(rejection);
                }
                result
            })
        })
    })
}

/// Run every message inside a `message` span carrying the topic.
#[must_use]
pub fn trace() -> Middleware {
    Arc::new(|topic: &str, next: Handler| -> Handler {
        let topic: Arc<str> = Arc::from(topic);
        Arc::new(move |payload: Vec<u8>| -> HandlerFuture {
            let span = tracing::debug_span!("message", topic = %topic, size = payload.len());
            Box::pin(next(payload).instrument(span))
        })
    })
}
