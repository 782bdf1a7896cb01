pub mod memory;
pub mod seed;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use jiff::Timestamp;
use ulid::Ulid;
use wattson_core::{Device, DeviceId, DeviceKind, DevicePatch, PowerStatus, Watts};

/// Failures a device store can report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("device store unavailable: {0}")]
    Unavailable(String),
    #[error("device {0} not found")]
    NotFound(DeviceId),
    #[error("device {0} already exists")]
    Duplicate(DeviceId),
    #[error("stored device {id} is corrupt: {reason}")]
    Corrupt { id: DeviceId, reason: String },
}

/// What a caller supplies to create a device. The store fills in the id,
/// the timestamps and the initial `on` status.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    pub name: String,
    pub kind: DeviceKind,
    pub current_power: Option<Watts>,
}

impl NewDevice {
    /// Materializes the record the store will persist.
    pub(crate) fn into_device(self) -> Device {
        let now = Timestamp::now();
        Device {
            id: DeviceId::from(Ulid::new().to_string()),
            name: self.name.into_boxed_str(),
            kind: self.kind,
            current_power: self.current_power,
            power_status: PowerStatus::On,
            last_updated: now.into(),
            created_at: now.into(),
        }
    }
}

/// Persistent collection of device documents.
///
/// `fetch_all` returns devices in insertion order; listing code relies on
/// that order to break ties.
#[async_trait]
pub trait DeviceStore: Clone + Send + Sync + 'static {
    async fn fetch_all(&self) -> Result<Vec<Device>, StoreError>;

    /// Writes status and timestamp of one device and nothing else.
    async fn patch(&self, id: &DeviceId, patch: DevicePatch) -> Result<(), StoreError>;

    async fn insert(&self, device: NewDevice) -> Result<Device, StoreError>;

    async fn remove(&self, id: &DeviceId) -> Result<(), StoreError>;
}
