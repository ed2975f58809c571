//! In-memory storage backend.
//!
//! Implements both storage ports on plain maps. Useful for tests and for
//! running the service without a database file.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use thermotwin_domain::current_state::CurrentState;
use thermotwin_domain::error::TwinError;
use thermotwin_domain::id::DeviceId;
use thermotwin_domain::target_state::TargetStatePatch;

use crate::ports::{CurrentStateRepository, TargetStateRepository};

/// Map-backed twin repository.
#[derive(Default)]
pub struct InMemoryTwinRepository {
    targets: Mutex<HashMap<DeviceId, TargetStatePatch>>,
    currents: Mutex<HashMap<DeviceId, CurrentState>>,
    target_writes: AtomicUsize,
    current_writes: AtomicUsize,
}

impl InMemoryTwinRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of target-state writes performed so far.
    #[must_use]
    pub fn target_writes(&self) -> usize {
        self.target_writes.load(Ordering::SeqCst)
    }

    /// Number of current-state writes performed so far.
    #[must_use]
    pub fn current_writes(&self) -> usize {
        self.current_writes.load(Ordering::SeqCst)
    }
}

impl TargetStateRepository for InMemoryTwinRepository {
    fn get_target_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<TargetStatePatch>, TwinError>> + Send {
        let stored = self
            .targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .copied();
        async move { Ok(stored) }
    }

    fn merge_target_state(
        &self,
        device_id: &DeviceId,
        patch: TargetStatePatch,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        {
            let mut targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = targets.entry(device_id.clone()).or_default();
            *entry = entry.merge(patch);
        }
        self.target_writes.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    }
}

impl CurrentStateRepository for InMemoryTwinRepository {
    fn get_current_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<CurrentState>, TwinError>> + Send {
        let stored = self
            .currents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .cloned();
        async move { Ok(stored) }
    }

    fn put_current_state(
        &self,
        state: &CurrentState,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        self.currents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(state.device_id.clone(), state.clone());
        self.current_writes.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    }
}
