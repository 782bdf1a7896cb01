use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use wattson_core::{Device, DeviceId, DevicePatch};

/// The board's in-memory copy of the collection.
///
/// Every read goes through this copy, so a toggle that is waiting on the
/// store is already visible to listings. The lock is never held across a
/// store call.
#[derive(Clone, Default)]
pub struct Snapshot {
    devices: Arc<RwLock<Vec<Device>>>,
}

impl Snapshot {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices: Arc::new(RwLock::new(devices)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Vec<Device>> {
        self.devices.read().await
    }

    pub async fn get(&self, id: &DeviceId) -> Option<Device> {
        let devices = self.devices.read().await;
        devices.iter().find(|device| &device.id == id).cloned()
    }

    /// Applies `patch` to the device in place. Returns `false` when the
    /// device is not in the snapshot.
    pub async fn apply(&self, id: &DeviceId, patch: &DevicePatch) -> bool {
        let mut devices = self.devices.write().await;
        match devices.iter_mut().find(|device| &device.id == id) {
            Some(slot) => {
                *slot = slot.with_patch(patch);
                true
            }
            None => false,
        }
    }

    /// Puts `rollback` back, but only while the device still shows
    /// `applied`. A refresh that landed in between wins.
    pub async fn revert(&self, id: &DeviceId, applied: &DevicePatch, rollback: &DevicePatch) -> bool {
        let mut devices = self.devices.write().await;
        match devices
            .iter_mut()
            .find(|device| &device.id == id && device.status_patch() == *applied)
        {
            Some(slot) => {
                *slot = slot.with_patch(rollback);
                true
            }
            None => false,
        }
    }

    /// Replaces the whole collection with `fetched`. Devices listed in
    /// `keep` retain their current in-memory record.
    pub async fn replace_all(&self, fetched: Vec<Device>, keep: &HashSet<DeviceId>) {
        let mut devices = self.devices.write().await;
        if keep.is_empty() {
            *devices = fetched;
            return;
        }

        let merged: Vec<Device> = fetched
            .into_iter()
            .map(|incoming| {
                if !keep.contains(&incoming.id) {
                    return incoming;
                }
                devices
                    .iter()
                    .find(|current| current.id == incoming.id)
                    .cloned()
                    .unwrap_or(incoming)
            })
            .collect();
        *devices = merged;
    }

    pub async fn push(&self, device: Device) {
        self.devices.write().await.push(device);
    }

    pub async fn remove(&self, id: &DeviceId) -> Option<Device> {
        let mut devices = self.devices.write().await;
        let index = devices.iter().position(|device| &device.id == id)?;
        Some(devices.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use wattson_core::{DeviceKind, PowerStatus, RawTimestamp};

    use super::*;

    fn device(id: &str, status: PowerStatus, stamp: &str) -> Device {
        Device {
            id: DeviceId::from(id),
            name: "Fridge".into(),
            kind: DeviceKind::Refrigerator,
            current_power: None,
            power_status: status,
            last_updated: RawTimestamp::Text(stamp.to_string()),
            created_at: RawTimestamp::Text("2025-01-01T00:00:00Z".to_string()),
        }
    }

    fn patch(status: PowerStatus, stamp: &str) -> DevicePatch {
        DevicePatch {
            power_status: status,
            last_updated: RawTimestamp::Text(stamp.to_string()),
        }
    }

    #[tokio::test]
    async fn test_revert_only_while_provisional_values_hold() {
        let id = DeviceId::from("d1");
        let snapshot = Snapshot::new(vec![device("d1", PowerStatus::On, "2025-01-01T10:00:00Z")]);
        let before = snapshot.get(&id).await.unwrap().status_patch();
        let applied = patch(PowerStatus::Off, "2025-01-01T11:00:00Z");

        assert!(snapshot.apply(&id, &applied).await);
        assert!(snapshot.revert(&id, &applied, &before).await);
        assert_eq!(snapshot.get(&id).await.unwrap().status_patch(), before);

        assert!(snapshot.apply(&id, &applied).await);
        let newer = patch(PowerStatus::On, "2025-01-01T12:00:00Z");
        assert!(snapshot.apply(&id, &newer).await);
        assert!(!snapshot.revert(&id, &applied, &before).await);
        assert_eq!(snapshot.get(&id).await.unwrap().status_patch(), newer);
    }

    #[tokio::test]
    async fn test_replace_all_keeps_listed_devices() {
        let snapshot = Snapshot::new(vec![
            device("d1", PowerStatus::Off, "2025-01-01T11:00:00Z"),
            device("d2", PowerStatus::On, "2025-01-01T10:00:00Z"),
        ]);
        let fetched = vec![
            device("d1", PowerStatus::On, "2025-01-01T10:00:00Z"),
            device("d2", PowerStatus::Off, "2025-01-02T10:00:00Z"),
            device("d3", PowerStatus::On, "2025-01-02T10:00:00Z"),
        ];
        let keep = HashSet::from([DeviceId::from("d1")]);

        snapshot.replace_all(fetched, &keep).await;

        let devices = snapshot.read().await;
        let statuses: Vec<PowerStatus> = devices.iter().map(|d| d.power_status).collect();
        assert_eq!(
            statuses,
            vec![PowerStatus::Off, PowerStatus::Off, PowerStatus::On]
        );
    }

    #[tokio::test]
    async fn test_push_and_remove() {
        let snapshot = Snapshot::default();
        snapshot.push(device("d1", PowerStatus::On, "2025-01-01T10:00:00Z")).await;

        assert!(snapshot.remove(&DeviceId::from("d1")).await.is_some());
        assert!(snapshot.remove(&DeviceId::from("d1")).await.is_none());
        assert!(snapshot.read().await.is_empty());
    }
}
