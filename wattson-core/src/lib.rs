use std::fmt;
use std::str::FromStr;

use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

pub mod date_index;
pub mod pipeline;
pub mod power;
pub mod tally;
pub mod timestamp;

pub use date_index::build_date_index;
pub use pipeline::{DeviceQuery, DeviceQueryBuilder, StatusFilter, select_devices};
pub use power::{InvalidWatts, PowerRange, PowerSummary, Watts, power_summary, random_power};
pub use tally::{StatusTally, tally_statuses};
pub use timestamp::{DayKey, InvalidDayKey, MalformedTimestamp, RawTimestamp};

// Names and ids never grow after they are read.
type BoxStr = Box<str>;

/// Identifier assigned to a device by the store that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub BoxStr);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id.into_boxed_str())
    }
}

/// On/off state of a device. There is no third state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    #[default]
    On,
    Off,
}

impl PowerStatus {
    pub fn toggled(self) -> Self {
        match self {
            PowerStatus::On => PowerStatus::Off,
            PowerStatus::Off => PowerStatus::On,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PowerStatus::On => "on",
            PowerStatus::Off => "off",
        }
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown power status {0:?}, expected \"on\" or \"off\"")]
pub struct UnknownPowerStatus(pub String);

impl FromStr for PowerStatus {
    type Err = UnknownPowerStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(PowerStatus::On),
            "off" => Ok(PowerStatus::Off),
            _ => Err(UnknownPowerStatus(s.to_string())),
        }
    }
}

/// Appliance category.
///
/// Stores may carry categories this enumeration does not know about; those
/// are kept verbatim in [`DeviceKind::Other`] so they survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceKind {
    AirConditioner,
    Refrigerator,
    WashingMachine,
    Tv,
    Lighting,
    Heater,
    Microwave,
    Computer,
    Dishwasher,
    Other(BoxStr),
}

impl DeviceKind {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceKind::AirConditioner => "air_conditioner",
            DeviceKind::Refrigerator => "refrigerator",
            DeviceKind::WashingMachine => "washing_machine",
            DeviceKind::Tv => "tv",
            DeviceKind::Lighting => "lighting",
            DeviceKind::Heater => "heater",
            DeviceKind::Microwave => "microwave",
            DeviceKind::Computer => "computer",
            DeviceKind::Dishwasher => "dishwasher",
            DeviceKind::Other(other) => other,
        }
    }

    /// Display icon for the category, with a plug for anything unknown.
    pub fn icon(&self) -> &'static str {
        match self {
            DeviceKind::AirConditioner => "❄️",
            DeviceKind::Refrigerator => "🧊",
            DeviceKind::WashingMachine => "🧺",
            DeviceKind::Tv => "📺",
            DeviceKind::Lighting => "💡",
            DeviceKind::Heater => "🔥",
            DeviceKind::Microwave => "🍲",
            DeviceKind::Computer => "💻",
            DeviceKind::Dishwasher => "🍽️",
            DeviceKind::Other(_) => "🔌",
        }
    }
}

impl From<&str> for DeviceKind {
    fn from(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "air_conditioner" => DeviceKind::AirConditioner,
            "refrigerator" | "fridge" => DeviceKind::Refrigerator,
            "washing_machine" => DeviceKind::WashingMachine,
            "tv" | "television" => DeviceKind::Tv,
            "lighting" | "lamp" => DeviceKind::Lighting,
            "heater" => DeviceKind::Heater,
            "microwave" => DeviceKind::Microwave,
            "computer" | "desktop" => DeviceKind::Computer,
            "dishwasher" => DeviceKind::Dishwasher,
            _ => DeviceKind::Other(raw.into()),
        }
    }
}

impl From<String> for DeviceKind {
    fn from(raw: String) -> Self {
        DeviceKind::from(raw.as_str())
    }
}

impl From<DeviceKind> for String {
    fn from(kind: DeviceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored household appliance, as held in a store document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Store-assigned identity, never changes.
    pub id: DeviceId,
    /// Label used for search and ordering.
    pub name: BoxStr,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    /// Instantaneous draw; absent readings aggregate as zero.
    #[serde(default)]
    pub current_power: Option<Watts>,
    #[serde(default)]
    pub power_status: PowerStatus,
    /// Refreshed together with `power_status` on every toggle.
    pub last_updated: RawTimestamp,
    pub created_at: RawTimestamp,
}

impl Device {
    /// Reported draw, with a missing reading counted as zero.
    pub fn power(&self) -> Watts {
        self.current_power.unwrap_or_default()
    }

    /// Calendar day of `last_updated` in the given zone.
    pub fn day_key(&self, tz: &TimeZone) -> Result<DayKey, MalformedTimestamp> {
        self.last_updated.day_key(tz)
    }

    /// Returns a new record with the patch applied; `self` is left untouched.
    pub fn with_patch(&self, patch: &DevicePatch) -> Device {
        Device {
            power_status: patch.power_status,
            last_updated: patch.last_updated.clone(),
            ..self.clone()
        }
    }

    /// The status/timestamp pair currently held by this record.
    pub fn status_patch(&self) -> DevicePatch {
        DevicePatch {
            power_status: self.power_status,
            last_updated: self.last_updated.clone(),
        }
    }
}

/// The only fields a status change writes back to the store. They always
/// travel together so a status never changes without a fresh timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePatch {
    pub power_status: PowerStatus,
    pub last_updated: RawTimestamp,
}

/// Day key of a device, or `None` (logged) when its timestamp is unusable.
pub(crate) fn day_of(device: &Device, tz: &TimeZone) -> Option<DayKey> {
    match device.day_key(tz) {
        Ok(day) => Some(day),
        Err(e) => {
            tracing::debug!(device_id = %device.id, error = %e, "skipping malformed lastUpdated");
            None
        }
    }
}
