//! Storage port — repository traits for persistence.
//!
//! Each method is a single atomic operation from the backend's point of view.
//! Ordering between operations on the same device is the caller's job
//! (see [`StateStore`](crate::services::state_store::StateStore)).

use std::future::Future;
use std::sync::Arc;

use thermotwin_domain::current_state::CurrentState;
use thermotwin_domain::error::TwinError;
use thermotwin_domain::id::DeviceId;
use thermotwin_domain::target_state::TargetStatePatch;

/// Persistence for the target half of the twin.
///
/// Stored target state is partial: a column may be missing until defaults
/// are materialized.
pub trait TargetStateRepository {
    /// Read whatever is stored for the device, `None` if no row exists.
    fn get_target_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<TargetStatePatch>, TwinError>> + Send;

    /// Write the fields present in `patch`, leaving the others untouched.
    /// Creates the row if needed.
    fn merge_target_state(
        &self,
        device_id: &DeviceId,
        patch: TargetStatePatch,
    ) -> impl Future<Output = Result<(), TwinError>> + Send;
}

/// Persistence for the current half of the twin.
pub trait CurrentStateRepository {
    /// Read the last accepted report, `None` if the device never reported.
    fn get_current_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<CurrentState>, TwinError>> + Send;

    /// Overwrite the stored report unconditionally.
    fn put_current_state(
        &self,
        state: &CurrentState,
    ) -> impl Future<Output = Result<(), TwinError>> + Send;
}

impl<T: TargetStateRepository + Send + Sync> TargetStateRepository for Arc<T> {
    fn get_target_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<TargetStatePatch>, TwinError>> + Send {
        (**self).get_target_state(device_id)
    }

    fn merge_target_state(
        &self,
        device_id: &DeviceId,
        patch: TargetStatePatch,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        (**self).merge_target_state(device_id, patch)
    }
}

impl<T: CurrentStateRepository + Send + Sync> CurrentStateRepository for Arc<T> {
    fn get_current_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<CurrentState>, TwinError>> + Send {
        (**self).get_current_state(device_id)
    }

    fn put_current_state(
        &self,
        state: &CurrentState,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        (**self).put_current_state(state)
    }
}
