use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use jiff::Timestamp;
use jiff::tz::TimeZone;
use tracing::{info, warn};
use wattson_core::timestamp::next_stamp;
use wattson_core::{Device, DeviceId, DevicePatch, RawTimestamp};

use crate::snapshot::Snapshot;
use crate::store::{DeviceStore, StoreError};

/// Where a device is in its toggle life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Idle,
    /// A status change is applied locally and waiting on the store.
    Pending,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToggleError {
    #[error("device {0} already has a toggle in flight")]
    InProgress(DeviceId),
    #[error("device {0} is not on the board")]
    UnknownDevice(DeviceId),
    #[error("toggle of device {id} failed and was rolled back: {cause}")]
    Failed {
        id: DeviceId,
        #[source]
        cause: ToggleFailure,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToggleFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("store did not answer within {0:?}")]
    TimedOut(Duration),
    #[error("toggle task was interrupted")]
    Interrupted,
}

/// Serializes status changes per device and persists them optimistically.
#[derive(Clone)]
pub struct ToggleController<S> {
    store: S,
    pending: Arc<Mutex<HashSet<DeviceId>>>,
    timeout: Duration,
}

/// Holds a device in the pending set until dropped.
struct PendingGuard {
    pending: Arc<Mutex<HashSet<DeviceId>>>,
    id: DeviceId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.id);
    }
}

// A panic while holding the lock cannot leave the set half-updated.
fn lock(pending: &Mutex<HashSet<DeviceId>>) -> MutexGuard<'_, HashSet<DeviceId>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: DeviceStore> ToggleController<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(HashSet::new())),
            timeout,
        }
    }

    pub fn state(&self, id: &DeviceId) -> ToggleState {
        if lock(&self.pending).contains(id) {
            ToggleState::Pending
        } else {
            ToggleState::Idle
        }
    }

    /// Ids that currently have a toggle in flight.
    pub fn pending(&self) -> HashSet<DeviceId> {
        lock(&self.pending).clone()
    }

    fn enter(&self, id: &DeviceId) -> Result<PendingGuard, ToggleError> {
        if !lock(&self.pending).insert(id.clone()) {
            return Err(ToggleError::InProgress(id.clone()));
        }
        Ok(PendingGuard {
            pending: self.pending.clone(),
            id: id.clone(),
        })
    }

    /// Flips the device's status in `snapshot` right away, then writes the
    /// change to the store. On any store failure the snapshot gets its
    /// previous status and timestamp back.
    pub async fn toggle(
        &self,
        snapshot: &Snapshot,
        id: &DeviceId,
        tz: &TimeZone,
    ) -> Result<Device, ToggleError> {
        let guard = self.enter(id)?;

        let Some(device) = snapshot.get(id).await else {
            return Err(ToggleError::UnknownDevice(id.clone()));
        };

        let rollback = device.status_patch();
        let applied = DevicePatch {
            power_status: device.power_status.toggled(),
            last_updated: RawTimestamp::Instant(next_stamp(
                Timestamp::now(),
                device.last_updated.normalize(tz).ok(),
                device.created_at.normalize(tz).ok(),
            )),
        };

        if !snapshot.apply(id, &applied).await {
            return Err(ToggleError::UnknownDevice(id.clone()));
        }

        let task = tokio::spawn(persist(
            self.store.clone(),
            snapshot.clone(),
            guard,
            applied.clone(),
            rollback,
            self.timeout,
        ));

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(device_id = %id, error = %e, "toggle task did not complete");
                Err(ToggleFailure::Interrupted)
            }
        };

        outcome
            .map(|()| device.with_patch(&applied))
            .map_err(|cause| ToggleError::Failed {
                id: id.clone(),
                cause,
            })
    }
}

async fn persist<S: DeviceStore>(
    store: S,
    snapshot: Snapshot,
    guard: PendingGuard,
    applied: DevicePatch,
    rollback: DevicePatch,
    timeout: Duration,
) -> Result<(), ToggleFailure> {
    let id = &guard.id;

    let result = match tokio::time::timeout(timeout, store.patch(id, applied.clone())).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ToggleFailure::Store(e)),
        Err(_) => Err(ToggleFailure::TimedOut(timeout)),
    };

    match &result {
        Ok(()) => {
            info!(device_id = %id, power_status = %applied.power_status, "device toggled");
        }
        Err(e) => {
            let restored = snapshot.revert(id, &applied, &rollback).await;
            warn!(device_id = %id, error = %e, restored, "toggle failed, rolling back");
        }
    }

    result
}
