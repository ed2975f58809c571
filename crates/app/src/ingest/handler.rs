//! Base handlers at the end of the middleware chain.

use std::sync::Arc;

use thermotwin_domain::current_state::CurrentState;
use thermotwin_domain::time::now;
use thermotwin_domain::validation::validate_current;

use super::{Handler, HandlerFuture, IngestError, Stage};
use crate::ports::{CurrentStateRepository, TargetStateRepository};
use crate::reconciler::Reconciler;
use crate::services::state_store::StateStore;

/// Handler for device current-state reports.
pub fn current_state<TR, CR>(store: Arc<StateStore<TR, CR>>, reconciler: Reconciler) -> Handler
where
    TR: TargetStateRepository + Send + Sync + 'static,
    CR: CurrentStateRepository + Send + Sync + 'static,
{
    Arc::new(move |payload: Vec<u8>| -> HandlerFuture {
        let store = Arc::clone(&store);
        Box::pin(async move { handle_report(&store, reconciler, &payload).await })
    })
}

async fn handle_report<TR, CR>(
    store: &StateStore<TR, CR>,
    reconciler: Reconciler,
    payload: &[u8],
) -> Result<(), IngestError>
where
    TR: TargetStateRepository + Send + Sync,
    CR: CurrentStateRepository + Send + Sync,
{
    let report: CurrentState = serde_json::from_slice(payload).map_err(IngestError::Decode)?;

    validate_current(&report, now())
        .map_err(|err| IngestError::at(Stage::Validating)(err.into()))?;

    let _guard = store.lock_current(&report.device_id).await;
    reconciler
        .admit(store, &report)
        .await
        .map_err(IngestError::at(Stage::Reconciling))?;

    let stored = store
        .upsert_current_state(report)
        .await
        .map_err(IngestError::at(Stage::Persisting))?;
    tracing::debug!(
        device_id = %stored.device_id,
        timestamp = %stored.timestamp,
        "current state accepted"
    );
    Ok(())
}
