use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use wattson_core::timestamp::format_display;
use wattson_core::{DayKey, Device, DeviceKind, PowerStatus, StatusTally};

// Device Request/Response Models
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCreateRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    #[serde(default)]
    pub current_power: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub icon: String,
    pub current_power: Option<f64>,
    pub power_status: PowerStatus,
    /// Normalized RFC 3339 instant, absent when the stored value is unusable
    pub last_updated: Option<String>,
    pub day: Option<DayKey>,
    pub last_updated_display: Option<String>,
}

impl DeviceResponse {
    pub fn new(device: &Device, tz: &TimeZone) -> Self {
        let instant = device.last_updated.normalize(tz).ok();

        DeviceResponse {
            id: device.id.to_string(),
            name: device.name.to_string(),
            kind: device.kind.clone(),
            icon: device.kind.icon().to_string(),
            current_power: device.current_power.map(|w| w.get()),
            power_status: device.power_status,
            last_updated: instant.map(|ts| ts.to_string()),
            day: instant.map(|ts| DayKey::of(ts, tz)),
            last_updated_display: instant.map(|ts| format_display(ts, tz)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub items: Vec<DeviceResponse>,
    pub count: usize,
    pub tally: TallyResponse,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TallyResponse {
    pub all: usize,
    pub on: usize,
    pub off: usize,
}

impl From<StatusTally> for TallyResponse {
    fn from(tally: StatusTally) -> Self {
        TallyResponse {
            all: tally.all,
            on: tally.on,
            off: tally.off,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub total_power: f64,
    pub top: Vec<DeviceResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub devices: usize,
}

// Common Response Models
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

// Query Parameters
#[derive(Debug, Deserialize, Default)]
pub struct DeviceListParams {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DayParams {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SummaryParams {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}
