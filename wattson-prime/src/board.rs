use std::time::Duration;

use jiff::tz::TimeZone;
use tracing::{debug, info, warn};
use wattson_core::{
    DayKey, Device, DeviceId, DeviceKind, DeviceQuery, StatusTally, Watts, build_date_index,
    power_summary, random_power, select_devices, tally_statuses,
};

use crate::snapshot::Snapshot;
use crate::store::{DeviceStore, NewDevice, StoreError};
use crate::toggle::{ToggleController, ToggleError, ToggleState};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoardError {
    #[error("device name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Listing for one query: the matching devices plus the day-scoped tally.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceView {
    pub devices: Vec<Device>,
    pub tally: StatusTally,
}

/// Owned counterpart of [`wattson_core::PowerSummary`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSummary {
    pub total: Watts,
    pub top: Vec<Device>,
}

/// A household's devices as seen from the board: the store, the local
/// snapshot every read is served from, and the toggle controller.
#[derive(Clone)]
pub struct DeviceBoard<S> {
    store: S,
    snapshot: Snapshot,
    toggles: ToggleController<S>,
    tz: TimeZone,
}

impl<S: DeviceStore> DeviceBoard<S> {
    /// Creates an empty board; call [`DeviceBoard::refresh`] to load it.
    pub fn new(store: S, tz: TimeZone, toggle_timeout: Duration) -> Self {
        Self {
            toggles: ToggleController::new(store.clone(), toggle_timeout),
            snapshot: Snapshot::default(),
            store,
            tz,
        }
    }

    pub fn time_zone(&self) -> &TimeZone {
        &self.tz
    }

    /// Reloads the snapshot from the store and returns the device count.
    ///
    /// When the store is unavailable the previous snapshot stays in place.
    /// Devices with a toggle in flight keep their local record.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let fetched = match self.store.fetch_all().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "refresh failed, keeping previous snapshot");
                return Err(e);
            }
        };

        let count = fetched.len();
        let pending = self.toggles.pending();
        self.snapshot.replace_all(fetched, &pending).await;

        debug!(devices = count, pending = pending.len(), "snapshot refreshed");
        Ok(count)
    }

    pub async fn dates(&self) -> Vec<DayKey> {
        let devices = self.snapshot.read().await;
        build_date_index(&devices, &self.tz)
    }

    pub async fn view(&self, query: &DeviceQuery) -> DeviceView {
        let devices = self.snapshot.read().await;
        DeviceView {
            devices: select_devices(&devices, query, &self.tz)
                .into_iter()
                .cloned()
                .collect(),
            tally: tally_statuses(&devices, query.day.as_ref(), &self.tz),
        }
    }

    pub async fn tally(&self, day: Option<&DayKey>) -> StatusTally {
        let devices = self.snapshot.read().await;
        tally_statuses(&devices, day, &self.tz)
    }

    pub async fn summary(&self, day: Option<&DayKey>, limit: usize) -> BoardSummary {
        let devices = self.snapshot.read().await;
        let summary = power_summary(&devices, day, limit, &self.tz);
        BoardSummary {
            total: summary.total,
            top: summary.top.into_iter().cloned().collect(),
        }
    }

    pub async fn toggle(&self, id: &DeviceId) -> Result<Device, ToggleError> {
        self.toggles.toggle(&self.snapshot, id, &self.tz).await
    }

    pub fn toggle_state(&self, id: &DeviceId) -> ToggleState {
        self.toggles.state(id)
    }

    /// Adds a device to the store and the snapshot. A missing reading is
    /// drawn from the category's typical range.
    pub async fn add_device(
        &self,
        name: &str,
        kind: DeviceKind,
        current_power: Option<Watts>,
    ) -> Result<Device, BoardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardError::EmptyName);
        }

        let current_power =
            current_power.unwrap_or_else(|| random_power(&kind, &mut rand::rng()));

        let device = self
            .store
            .insert(NewDevice {
                name: name.to_string(),
                kind,
                current_power: Some(current_power),
            })
            .await?;

        self.snapshot.push(device.clone()).await;
        info!(device_id = %device.id, kind = %device.kind, "device added");
        Ok(device)
    }

    pub async fn remove_device(&self, id: &DeviceId) -> Result<(), BoardError> {
        self.store.remove(id).await?;
        self.snapshot.remove(id).await;
        info!(device_id = %id, "device removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wattson_core::{DeviceQueryBuilder, PowerStatus, StatusFilter};

    use super::*;
    use crate::store::MemoryStore;
    use crate::store::seed::demo_devices;

    async fn demo_board() -> DeviceBoard<MemoryStore> {
        let store = MemoryStore::with_devices(demo_devices()).unwrap();
        let board = DeviceBoard::new(store, TimeZone::UTC, Duration::from_secs(1));
        board.refresh().await.unwrap();
        board
    }

    #[tokio::test]
    async fn test_view_filters_and_tallies_day_scope() {
        let board = demo_board().await;
        let day: DayKey = "2025-01-02".parse().unwrap();

        let query = DeviceQueryBuilder::new()
            .day(day)
            .status(StatusFilter::On)
            .build();
        let view = board.view(&query).await;

        let names: Vec<&str> = view.devices.iter().map(|d| &*d.name).collect();
        assert_eq!(names, vec!["Desktop", "Refrigerator"]);
        assert_eq!(
            view.tally,
            StatusTally {
                all: 3,
                on: 2,
                off: 1
            }
        );
    }

    #[tokio::test]
    async fn test_dates_and_summary() {
        let board = demo_board().await;

        let dates: Vec<String> = board.dates().await.iter().map(ToString::to_string).collect();
        assert_eq!(dates, vec!["2025-01-01", "2025-01-02"]);

        let day: DayKey = "2025-01-01".parse().unwrap();
        let summary = board.summary(Some(&day), 1).await;
        assert_eq!(summary.total.get(), 1430.0);
        assert_eq!(&*summary.top[0].name, "Air Conditioner");
    }

    #[tokio::test]
    async fn test_add_and_remove_device() {
        let board = demo_board().await;

        assert_eq!(
            board.add_device("   ", DeviceKind::Heater, None).await,
            Err(BoardError::EmptyName)
        );

        let heater = board
            .add_device("Heater", DeviceKind::Heater, None)
            .await
            .unwrap();
        let watts = heater.power().get();
        assert!((1500.0..=2500.0).contains(&watts), "{watts}");
        assert_eq!(heater.power_status, PowerStatus::On);
        assert_eq!(board.tally(None).await.all, 7);

        board.remove_device(&heater.id).await.unwrap();
        assert_eq!(board.tally(None).await.all, 6);
        assert_eq!(
            board.remove_device(&heater.id).await,
            Err(BoardError::Store(StoreError::NotFound(heater.id.clone())))
        );
    }
}
