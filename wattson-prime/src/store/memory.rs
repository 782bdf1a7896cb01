use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use wattson_core::{Device, DeviceId, DevicePatch};

use super::{DeviceStore, NewDevice, StoreError};

/// In-process store. Devices live in a vector so insertion order is the
/// collection order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    devices: Arc<RwLock<Vec<Device>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `devices`, rejecting duplicate ids.
    pub fn with_devices(devices: Vec<Device>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(devices.len());
        for device in &devices {
            if !seen.insert(&device.id) {
                return Err(StoreError::Duplicate(device.id.clone()));
            }
        }

        Ok(Self {
            devices: Arc::new(RwLock::new(devices)),
        })
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<Device>, StoreError> {
        let devices = self.devices.read().await;
        Ok(devices.clone())
    }

    async fn patch(&self, id: &DeviceId, patch: DevicePatch) -> Result<(), StoreError> {
        let mut devices = self.devices.write().await;
        let slot = devices
            .iter_mut()
            .find(|device| &device.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        *slot = slot.with_patch(&patch);
        Ok(())
    }

    async fn insert(&self, device: NewDevice) -> Result<Device, StoreError> {
        let device = device.into_device();
        let mut devices = self.devices.write().await;
        if devices.iter().any(|existing| existing.id == device.id) {
            return Err(StoreError::Duplicate(device.id));
        }

        devices.push(device.clone());
        Ok(device)
    }

    async fn remove(&self, id: &DeviceId) -> Result<(), StoreError> {
        let mut devices = self.devices.write().await;
        let before = devices.len();
        devices.retain(|device| &device.id != id);

        if devices.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }
}
