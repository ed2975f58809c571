//! Shared fakes for unit tests.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thermotwin_domain::current_state::{CurrentState, OperatingState};
use thermotwin_domain::error::{StaleReportError, TwinError};
use thermotwin_domain::id::DeviceId;
use thermotwin_domain::target_state::{TargetState, TargetStatePatch};
use thermotwin_domain::time::Timestamp;

use crate::memory::InMemoryTwinRepository;
use crate::ports::{
    CurrentStateRepository, EventStatus, MessagePublisher, TargetStateRepository, TwinTelemetry,
};

pub fn report(device_id: &str, timestamp: Timestamp) -> CurrentState {
    CurrentState {
        device_id: DeviceId::from(device_id),
        timestamp,
        operating_state: OperatingState::Heating,
        current_temperature: 19.5,
        current_humidity: Some(40.0),
    }
}

fn backend_down() -> TwinError {
    TwinError::storage(std::io::Error::other("backend down"))
}

/// Every call fails with a storage error.
pub struct FailingRepository;

impl TargetStateRepository for FailingRepository {
    fn get_target_state(
        &self,
        _device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<TargetStatePatch>, TwinError>> + Send {
        async { Err(backend_down()) }
    }

    fn merge_target_state(
        &self,
        _device_id: &DeviceId,
        _patch: TargetStatePatch,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        async { Err(backend_down()) }
    }
}

impl CurrentStateRepository for FailingRepository {
    fn get_current_state(
        &self,
        _device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<CurrentState>, TwinError>> + Send {
        async { Err(backend_down()) }
    }

    fn put_current_state(
        &self,
        _state: &CurrentState,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        async { Err(backend_down()) }
    }
}

/// Reads of current state fail, writes go to the wrapped repository.
pub struct UnreadableCurrents(pub Arc<InMemoryTwinRepository>);

impl CurrentStateRepository for UnreadableCurrents {
    fn get_current_state(
        &self,
        _device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<CurrentState>, TwinError>> + Send {
        async { Err(backend_down()) }
    }

    fn put_current_state(
        &self,
        state: &CurrentState,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        self.0.put_current_state(state)
    }
}

/// Publisher that always fails.
pub struct FailingPublisher;

impl MessagePublisher for FailingPublisher {
    fn publish(
        &self,
        _topic: &str,
        _payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TwinError>> + Send {
        async { Err(TwinError::publish(std::io::Error::other("broker down"))) }
    }
}

/// One recorded `event_processed` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    pub topic: String,
    pub device_id: String,
    pub status: EventStatus,
}

/// Telemetry that remembers what it was told.
#[derive(Default)]
pub struct RecordingTelemetry {
    targets: AtomicUsize,
    currents: AtomicUsize,
    rejections: AtomicUsize,
    events: Mutex<Vec<ProcessedEvent>>,
}

impl RecordingTelemetry {
    pub fn targets_changed(&self) -> usize {
        self.targets.load(Ordering::SeqCst)
    }

    pub fn currents_changed(&self) -> usize {
        self.currents.load(Ordering::SeqCst)
    }

    pub fn rejections(&self) -> usize {
        self.rejections.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<ProcessedEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TwinTelemetry for RecordingTelemetry {
    fn target_state_changed(&self, _state: &TargetState) {
        self.targets.fetch_add(1, Ordering::SeqCst);
    }

    fn current_state_changed(&self, _state: &CurrentState) {
        self.currents.fetch_add(1, Ordering::SeqCst);
    }

    fn event_processed(
        &self,
        topic: &str,
        device_id: &str,
        status: EventStatus,
        _elapsed: Duration,
    ) {
        self.events.lock().unwrap().push(ProcessedEvent {
            topic: topic.to_string(),
            device_id: device_id.to_string(),
            status,
        });
    }

    fn report_rejected(&self, _rejection: &StaleReportError) {
        self.rejections.fetch_add(1, Ordering::SeqCst);
    }

    fn request_handled(&self, _route: &str, _status_code: u16, _elapsed: Duration) {}
}
