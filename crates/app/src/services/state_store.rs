//! State store — the only writer of twin state.
//!
//! Wraps the storage ports with default materialization, partial upserts and
//! per-device mutual exclusion. Every successful write is reported to the
//! telemetry port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use thermotwin_domain::current_state::CurrentState;
use thermotwin_domain::error::{NotFoundError, TwinError};
use thermotwin_domain::id::DeviceId;
use thermotwin_domain::target_state::{TargetDefaults, TargetState, TargetStatePatch};

use crate::ports::{CurrentStateRepository, TargetStateRepository, TwinTelemetry};

type LockMap = Arc<Mutex<HashMap<DeviceId, Arc<AsyncMutex<()>>>>>;

/// One async lock per device, created on first use and removed once nobody
/// holds or waits for it, so the map only grows with concurrently busy devices.
#[derive(Default)]
struct DeviceLocks {
    inner: LockMap,
}

impl DeviceLocks {
    async fn lock(&self, device_id: &DeviceId) -> DeviceGuard {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(device_id.clone()).or_default())
        };
        DeviceGuard {
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.inner),
            device_id: device_id.clone(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive access to one device, released on drop.
pub struct DeviceGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
    device_id: DeviceId,
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // clones are only taken under the map lock, so a count of one is final
        if locks
            .get(&self.device_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.device_id);
        }
    }
}

/// Per-device twin storage with default materialization.
pub struct StateStore<TR, CR> {
    targets: TR,
    currents: CR,
    defaults: TargetDefaults,
    telemetry: Arc<dyn TwinTelemetry>,
    target_locks: DeviceLocks,
    current_locks: DeviceLocks,
}

impl<TR, CR> StateStore<TR, CR>
where
    TR: TargetStateRepository + Send + Sync,
    CR: CurrentStateRepository + Send + Sync,
{
    /// Create a store over the given repositories.
    ///
    /// `defaults` are expected to be valid already (see
    /// [`validate_defaults`](thermotwin_domain::validation::validate_defaults)).
    pub fn new(
        targets: TR,
        currents: CR,
        defaults: TargetDefaults,
        telemetry: Arc<dyn TwinTelemetry>,
    ) -> Self {
        Self {
            targets,
            currents,
            defaults,
            telemetry,
            target_locks: DeviceLocks::default(),
            current_locks: DeviceLocks::default(),
        }
    }

    /// Defaults used for fields a device never had.
    #[must_use]
    pub fn defaults(&self) -> TargetDefaults {
        self.defaults
    }

    /// Telemetry sink shared with the rest of the core.
    #[must_use]
    pub fn telemetry(&self) -> &Arc<dyn TwinTelemetry> {
        &self.telemetry
    }

    /// Return the complete target state of a device.
    ///
    /// Missing fields are filled with the configured defaults and persisted,
    /// so the first read of an unknown device performs one write and later
    /// reads perform none.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self), fields(device_id = %device_id))]
    pub async fn fetch_target_state(&self, device_id: &DeviceId) -> Result<TargetState, TwinError> {
        let _guard = self.target_locks.lock(device_id).await;
        self.load_target(device_id).await
    }

    /// Write the fields present in `patch` and return the resulting record.
    ///
    /// An empty patch writes nothing beyond default materialization.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self, patch), fields(device_id = %device_id))]
    pub async fn upsert_target_state(
        &self,
        device_id: &DeviceId,
        patch: TargetStatePatch,
    ) -> Result<TargetState, TwinError> {
        let _guard = self.target_locks.lock(device_id).await;
        if !patch.is_empty() {
            self.targets.merge_target_state(device_id, patch).await?;
            tracing::debug!(?patch, "target state merged");
        }
        let state = self.load_target(device_id).await?;
        if !patch.is_empty() {
            self.telemetry.target_state_changed(&state);
        }
        Ok(state)
    }

    /// Read the stored target state, materializing defaults for missing
    /// fields. Callers must hold the device's target lock.
    async fn load_target(&self, device_id: &DeviceId) -> Result<TargetState, TwinError> {
        let stored = self
            .targets
            .get_target_state(device_id)
            .await?
            .unwrap_or_default();

        let missing = stored.missing_from(&self.defaults);
        if missing.is_empty() {
            return Ok(stored.with_defaults(device_id.clone(), &self.defaults));
        }

        self.targets.merge_target_state(device_id, missing).await?;
        let state = stored
            .merge(missing)
            .with_defaults(device_id.clone(), &self.defaults);
        tracing::info!(
            mode = %state.mode,
            target_temperature = state.target_temperature,
            "target defaults materialized"
        );
        self.telemetry.target_state_changed(&state);
        Ok(state)
    }

    /// Return the last accepted report of a device.
    ///
    /// # Errors
    ///
    /// Returns [`TwinError::NotFound`] if the device never reported, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self), fields(device_id = %device_id))]
    pub async fn fetch_current_state(
        &self,
        device_id: &DeviceId,
    ) -> Result<CurrentState, TwinError> {
        self.currents
            .get_current_state(device_id)
            .await?
            .ok_or_else(|| {
                NotFoundError {
                    entity: "CurrentState",
                    device_id: device_id.clone(),
                }
                .into()
            })
    }

    /// Overwrite the stored report unconditionally.
    ///
    /// Ordering is the caller's job: take [`lock_current`](Self::lock_current)
    /// and run the reconciler first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self, state), fields(device_id = %state.device_id))]
    pub async fn upsert_current_state(
        &self,
        state: CurrentState,
    ) -> Result<CurrentState, TwinError> {
        self.currents.put_current_state(&state).await?;
        self.telemetry.current_state_changed(&state);
        Ok(state)
    }

    /// Serialize report handling for one device.
    ///
    /// Held across fetch, reconciliation and upsert so two concurrent reports
    /// cannot both pass the staleness check.
    pub async fn lock_current(&self, device_id: &DeviceId) -> DeviceGuard {
        self.current_locks.lock(device_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTwinRepository;
    use crate::ports::NoopTelemetry;
    use crate::testing::{FailingRepository, RecordingTelemetry, report};
    use chrono::Utc;
    use thermotwin_domain::target_state::Mode;

    type Store = StateStore<Arc<InMemoryTwinRepository>, Arc<InMemoryTwinRepository>>;

    fn store() -> (Store, Arc<InMemoryTwinRepository>) {
        let repo = Arc::new(InMemoryTwinRepository::new());
        let store = StateStore::new(
            Arc::clone(&repo),
            Arc::clone(&repo),
            TargetDefaults::default(),
            Arc::new(NoopTelemetry),
        );
        (store, repo)
    }

    #[tokio::test]
    async fn should_materialize_defaults_once() {
        let (store, repo) = store();
        let id = DeviceId::from("d1");

        let first = store.fetch_target_state(&id).await.unwrap();
        let second = store.fetch_target_state(&id).await.unwrap();

        assert_eq!(first.mode, Mode::Off);
        assert_eq!(first.target_temperature, 20);
        assert_eq!(first, second);
        assert_eq!(repo.target_writes(), 1);
    }

    #[tokio::test]
    async fn should_only_default_missing_field() {
        let (store, repo) = store();
        let id = DeviceId::from("d1");
        repo.merge_target_state(
            &id,
            TargetStatePatch {
                mode: Some(Mode::Heat),
                target_temperature: None,
            },
        )
        .await
        .unwrap();

        let state = store.fetch_target_state(&id).await.unwrap();

        assert_eq!(state.mode, Mode::Heat);
        assert_eq!(state.target_temperature, 20);
        let stored = repo.get_target_state(&id).await.unwrap().unwrap();
        assert_eq!(stored.target_temperature, Some(20));
    }

    #[tokio::test]
    async fn should_commute_disjoint_partial_updates() {
        let heat = TargetStatePatch {
            mode: Some(Mode::Heat),
            target_temperature: None,
        };
        let twenty = TargetStatePatch {
            mode: None,
            target_temperature: Some(20),
        };
        let id = DeviceId::from("d1");

        let (forward, _) = store();
        forward.upsert_target_state(&id, heat).await.unwrap();
        let a = forward.upsert_target_state(&id, twenty).await.unwrap();

        let (backward, _) = store();
        backward.upsert_target_state(&id, twenty).await.unwrap();
        let b = backward.upsert_target_state(&id, heat).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.mode, Mode::Heat);
        assert_eq!(a.target_temperature, 20);
    }

    #[tokio::test]
    async fn should_round_trip_full_update() {
        let (store, _) = store();
        let id = DeviceId::from("d1");
        store
            .upsert_target_state(
                &id,
                TargetStatePatch {
                    mode: Some(Mode::Cool),
                    target_temperature: Some(15),
                },
            )
            .await
            .unwrap();

        let state = store.fetch_target_state(&id).await.unwrap();
        assert_eq!(
            state,
            TargetState {
                device_id: id,
                mode: Mode::Cool,
                target_temperature: 15,
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_not_lose_concurrent_field_updates() {
        let (store, _) = store();
        let store = Arc::new(store);
        let id = DeviceId::from("d1");

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let patch = if i % 2 == 0 {
                    TargetStatePatch {
                        mode: Some(Mode::Auto),
                        target_temperature: None,
                    }
                } else {
                    TargetStatePatch {
                        mode: None,
                        target_temperature: Some(7),
                    }
                };
                store.upsert_target_state(&id, patch).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let state = store.fetch_target_state(&id).await.unwrap();
        assert_eq!(state.mode, Mode::Auto);
        assert_eq!(state.target_temperature, 7);
    }

    #[tokio::test]
    async fn should_report_missing_current_state_as_not_found() {
        let (store, _) = store();
        let err = store
            .fetch_current_state(&DeviceId::from("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, TwinError::NotFound(ref e) if e.entity == "CurrentState"));
    }

    #[tokio::test]
    async fn should_overwrite_current_state() {
        let (store, _) = store();
        let now = Utc::now();
        let older = report("d1", now - chrono::Duration::seconds(10));
        let newer = report("d1", now);

        store.upsert_current_state(newer.clone()).await.unwrap();
        store.upsert_current_state(older.clone()).await.unwrap();

        let stored = store.fetch_current_state(&DeviceId::from("d1")).await.unwrap();
        assert_eq!(stored, older);
    }

    #[tokio::test]
    async fn should_notify_telemetry_on_writes() {
        let repo = Arc::new(InMemoryTwinRepository::new());
        let telemetry = Arc::new(RecordingTelemetry::default());
        let store = StateStore::new(
            Arc::clone(&repo),
            Arc::clone(&repo),
            TargetDefaults::default(),
            telemetry.clone(),
        );
        let id = DeviceId::from("d1");

        store.fetch_target_state(&id).await.unwrap();
        store.fetch_target_state(&id).await.unwrap();
        store
            .upsert_current_state(report("d1", Utc::now()))
            .await
            .unwrap();

        assert_eq!(telemetry.targets_changed(), 1);
        assert_eq!(telemetry.currents_changed(), 1);
    }

    #[tokio::test]
    async fn should_propagate_storage_failures() {
        let store = StateStore::new(
            FailingRepository,
            FailingRepository,
            TargetDefaults::default(),
            Arc::new(NoopTelemetry),
        );
        let id = DeviceId::from("d1");

        assert!(matches!(
            store.fetch_target_state(&id).await,
            Err(TwinError::Storage(_))
        ));
        assert!(matches!(
            store.fetch_current_state(&id).await,
            Err(TwinError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn should_release_device_locks_once_idle() {
        let (store, _) = store();

        for i in 0..10 {
            let id = DeviceId::from(format!("d{i}"));
            store.fetch_target_state(&id).await.unwrap();
            drop(store.lock_current(&id).await);
        }

        assert_eq!(store.target_locks.len(), 0);
        assert_eq!(store.current_locks.len(), 0);
    }

    #[tokio::test]
    async fn should_keep_lock_while_someone_waits() {
        let (store, _) = store();
        let store = Arc::new(store);
        let id = DeviceId::from("d1");

        let held = store.lock_current(&id).await;
        let waiter = {
            let store = Arc::clone(&store);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = store.lock_current(&id).await;
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(store.current_locks.len(), 1);

        drop(held);
        waiter.await.unwrap();
        assert_eq!(store.current_locks.len(), 0);
    }
}
