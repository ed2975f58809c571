//! Reconciler — decides whether a device report supersedes the stored one.
//!
//! The stored current state always reflects the newest report ever accepted.
//! Equal timestamps are accepted (last write wins), strictly older ones are
//! rejected without touching the store.

use thermotwin_domain::current_state::CurrentState;
use thermotwin_domain::error::{StaleReportError, TwinError};

use crate::ports::{CurrentStateRepository, TargetStateRepository};
use crate::services::state_store::StateStore;

/// What to do when the stored report cannot be read for a reason other
/// than "not found".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchFailurePolicy {
    /// Propagate the failure and leave the store untouched.
    #[default]
    Reject,
    /// Accept the report as if nothing was stored.
    Accept,
}

/// Staleness policy for inbound reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    policy: FetchFailurePolicy,
}

impl Reconciler {
    #[must_use]
    pub fn new(policy: FetchFailurePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> FetchFailurePolicy {
        self.policy
    }

    /// Compare a report against the stored one, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StaleReportError`] when `report` was taken strictly before `stored`.
    pub fn decide(
        report: &CurrentState,
        stored: Option<&CurrentState>,
    ) -> Result<(), StaleReportError> {
        match stored {
            Some(stored) if report.is_older_than(stored) => Err(StaleReportError {
                device_id: report.device_id.clone(),
                reported: report.timestamp,
                stored: stored.timestamp,
            }),
            _ => Ok(()),
        }
    }

    /// Fetch the stored report and decide whether `report` may replace it.
    ///
    /// The caller must hold the device's current-state lock.
    ///
    /// # Errors
    ///
    /// Returns [`TwinError::Stale`] for an out-of-order report, or the fetch
    /// failure under [`FetchFailurePolicy::Reject`].
    pub async fn admit<TR, CR>(
        &self,
        store: &StateStore<TR, CR>,
        report: &CurrentState,
    ) -> Result<(), TwinError>
    where
        TR: TargetStateRepository + Send + Sync,
        CR: CurrentStateRepository + Send + Sync,
    {
        let stored = match store.fetch_current_state(&report.device_id).await {
            Ok(stored) => Some(stored),
            Err(TwinError::NotFound(_)) => None,
            Err(err) => match self.policy {
                FetchFailurePolicy::Reject => return Err(err),
                FetchFailurePolicy::Accept => {
                    tracing::warn!(
                        device_id = %report.device_id,
                        error = %err,
                        "stored report unreadable, accepting incoming report"
                    );
                    None
                }
            },
        };
        Self::decide(report, stored.as_ref())?;
        Ok(())
    }
}
