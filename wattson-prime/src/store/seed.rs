use std::path::Path;

use wattson_core::{Device, DeviceId, DeviceKind, PowerStatus, RawTimestamp, Watts};

/// Reads a JSON array of device documents, e.g. an export of the
/// household's device collection.
pub fn load(path: &Path) -> color_eyre::Result<Vec<Device>> {
    let content = std::fs::read_to_string(path)?;
    let devices: Vec<Device> = serde_json::from_str(&content)?;
    Ok(devices)
}

/// Two days of readings for three appliances, enough to exercise the date
/// selector and both status filters.
pub fn demo_devices() -> Vec<Device> {
    [
        ("demo-ac-0101", "Air Conditioner", 1250u32, PowerStatus::On, "2025-01-01T08:32:15"),
        ("demo-fridge-0101", "Refrigerator", 180, PowerStatus::On, "2025-01-01T10:20:05"),
        ("demo-desktop-0101", "Desktop", 0, PowerStatus::Off, "2025-01-01T18:54:11"),
        ("demo-ac-0102", "Air Conditioner", 0, PowerStatus::Off, "2025-01-02T09:12:08"),
        ("demo-fridge-0102", "Refrigerator", 210, PowerStatus::On, "2025-01-02T11:45:55"),
        ("demo-desktop-0102", "Desktop", 420, PowerStatus::On, "2025-01-02T14:18:20"),
    ]
    .into_iter()
    .map(|(id, name, watts, power_status, stamp)| Device {
        id: DeviceId::from(id),
        name: name.into(),
        kind: DeviceKind::from(name),
        current_power: Some(Watts::from(watts)),
        power_status,
        last_updated: RawTimestamp::Text(stamp.to_string()),
        created_at: RawTimestamp::Text("2025-01-01T00:00:00".to_string()),
    })
    .collect()
}
