//! Twin service — HTTP-triggered reads and target-state updates.

use std::sync::Arc;

use thermotwin_domain::current_state::CurrentState;
use thermotwin_domain::error::{TwinError, ValidationError};
use thermotwin_domain::id::DeviceId;
use thermotwin_domain::target_state::{TargetState, TargetStatePatch};
use thermotwin_domain::validation::{
    validate_current_fields, validate_device_id, validate_target, validate_target_patch,
};

use crate::ports::{CurrentStateRepository, MessagePublisher, TargetStateRepository};
use crate::services::state_store::StateStore;

/// Persisted data failed re-validation on the way out.
#[derive(Debug, thiserror::Error)]
#[error("stored {entity} for device {device_id} is invalid")]
pub struct CorruptStateError {
    pub entity: &'static str,
    pub device_id: DeviceId,
    #[source]
    pub source: ValidationError,
}

/// Command dispatch: writes go through the store, then out to the device.
pub struct TwinService<TR, CR, P> {
    store: Arc<StateStore<TR, CR>>,
    publisher: P,
    outbound_topic: String,
}

impl<TR, CR, P> TwinService<TR, CR, P>
where
    TR: TargetStateRepository + Send + Sync,
    CR: CurrentStateRepository + Send + Sync,
    P: MessagePublisher + Send + Sync,
{
    /// Create a service publishing complete target states on `outbound_topic`.
    pub fn new(
        store: Arc<StateStore<TR, CR>>,
        publisher: P,
        outbound_topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            publisher,
            outbound_topic: outbound_topic.into(),
        }
    }

    /// Return the target state, materializing defaults as needed.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank id, or a storage error
    /// (including for stored data that fails validation).
    #[tracing::instrument(skip(self), fields(device_id = %device_id))]
    pub async fn get_target_state(&self, device_id: &DeviceId) -> Result<TargetState, TwinError> {
        validate_device_id(device_id)?;
        let state = self.store.fetch_target_state(device_id).await?;
        checked_target(state)
    }

    /// Return the last accepted report, re-validated before leaving the service.
    ///
    /// The recency rule is not applied: a silent device still has a valid
    /// last reading.
    ///
    /// # Errors
    ///
    /// Returns [`TwinError::NotFound`] if the device never reported, or a
    /// storage error (including for stored data that fails validation).
    #[tracing::instrument(skip(self), fields(device_id = %device_id))]
    pub async fn get_current_state(&self, device_id: &DeviceId) -> Result<CurrentState, TwinError> {
        validate_device_id(device_id)?;
        let state = self.store.fetch_current_state(device_id).await?;
        if let Err(source) = validate_current_fields(&state) {
            tracing::error!(
                field = source.field(),
                error = %source,
                "stored current state is invalid"
            );
            return Err(TwinError::storage(CorruptStateError {
                entity: "CurrentState",
                device_id: device_id.clone(),
                source,
            }));
        }
        Ok(state)
    }

    /// Apply a partial update and push the resulting full record to the device.
    ///
    /// A publish failure is returned to the caller but the store write stands;
    /// the next successful update carries the full desired state forward.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, a storage error (including
    /// when the merged record fails validation, in which case nothing is
    /// published), or [`TwinError::Publish`] if the outbound channel failed.
    #[tracing::instrument(skip(self, patch), fields(device_id = %device_id))]
    pub async fn update_target_state(
        &self,
        device_id: &DeviceId,
        patch: TargetStatePatch,
    ) -> Result<TargetState, TwinError> {
        validate_device_id(device_id)?;
        validate_target_patch(&patch)?;

        let state = self.store.upsert_target_state(device_id, patch).await?;
        let state = checked_target(state)?;

        let payload = serde_json::to_vec(&state).map_err(TwinError::publish)?;
        self.publisher
            .publish(&self.outbound_topic, payload)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    error = ?err,
                    topic = %self.outbound_topic,
                    "target state stored but not published"
                );
            })?;
        tracing::info!(
            mode = %state.mode,
            target_temperature = state.target_temperature,
            "target state updated"
        );
        Ok(state)
    }
}

/// Re-validate a target state read back from storage. The patch was checked
/// before the write, so a failure here points at bad persisted data.
fn checked_target(state: TargetState) -> Result<TargetState, TwinError> {
    match validate_target(&state) {
        Ok(()) => Ok(state),
        Err(source) => {
            tracing::error!(
                field = source.field(),
                error = %source,
                "stored target state is invalid"
            );
            Err(TwinError::storage(CorruptStateError {
                entity: "TargetState",
                device_id: state.device_id,
                source,
            }))
        }
    }
}
