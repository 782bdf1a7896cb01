use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

use crate::{Device, DayKey, PowerStatus, day_of};

/// Which power states a listing should include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    On,
    Off,
}

impl StatusFilter {
    pub fn matches(self, status: PowerStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::On => status == PowerStatus::On,
            StatusFilter::Off => status == PowerStatus::Off,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status filter {0:?}, expected \"all\", \"on\" or \"off\"")]
pub struct UnknownStatusFilter(pub String);

impl FromStr for StatusFilter {
    type Err = UnknownStatusFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "on" => Ok(StatusFilter::On),
            "off" => Ok(StatusFilter::Off),
            _ => Err(UnknownStatusFilter(s.to_string())),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "all",
            StatusFilter::On => "on",
            StatusFilter::Off => "off",
        })
    }
}

/// Day, status and name constraints for a device listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQuery {
    /// `None` shows every day.
    pub day: Option<DayKey>,
    pub status: StatusFilter,
    /// Case-insensitive name fragment; empty matches everything.
    pub search: String,
}

impl DeviceQuery {
    pub fn builder() -> DeviceQueryBuilder {
        DeviceQueryBuilder::new()
    }
}

#[derive(Default)]
pub struct DeviceQueryBuilder {
    query: DeviceQuery,
}

impl DeviceQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day(mut self, day: DayKey) -> Self {
        self.query.day = Some(day);
        self
    }

    pub fn maybe_day(mut self, day: Option<DayKey>) -> Self {
        self.query.day = day;
        self
    }

    pub fn status(mut self, status: StatusFilter) -> Self {
        self.query.status = status;
        self
    }

    pub fn search<S>(mut self, search: S) -> Self
    where
        S: Into<String>,
    {
        self.query.search = search.into();
        self
    }

    pub fn build(self) -> DeviceQuery {
        self.query
    }
}

/// Whether `device` falls inside the selected day. With no day selected
/// every device does; with one, devices lacking a usable day never do.
pub fn in_day_scope(device: &Device, day: Option<&DayKey>, tz: &TimeZone) -> bool {
    match day {
        None => true,
        Some(day) => day_of(device, tz).as_ref() == Some(day),
    }
}

/// Applies day, status and search scope, then orders by name.
///
/// The sort is stable, so devices whose names compare equal keep their
/// order from `devices`.
pub fn select_devices<'a>(
    devices: &'a [Device],
    query: &DeviceQuery,
    tz: &TimeZone,
) -> Vec<&'a Device> {
    let needle = query.search.to_lowercase();

    let mut selected: Vec<&Device> = devices
        .iter()
        .filter(|device| in_day_scope(device, query.day.as_ref(), tz))
        .filter(|device| query.status.matches(device.power_status))
        .filter(|device| needle.is_empty() || device.name.to_lowercase().contains(&needle))
        .collect();

    selected.sort_by(|a, b| compare_names(&a.name, &b.name));
    selected
}

/// Dictionary-style name order: case-folded first, and on a case-only
/// difference the lowercase spelling sorts first.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));

    folded.then_with(|| {
        a.chars()
            .map(char::is_uppercase)
            .cmp(b.chars().map(char::is_uppercase))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{device, fridge_and_heater};

    fn names(devices: &[&Device]) -> Vec<String> {
        devices.iter().map(|d| d.name.to_string()).collect()
    }

    fn day(s: &str) -> DayKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_day_scope_only() {
        let devices = fridge_and_heater();
        let query = DeviceQuery::builder().day(day("2025-01-01")).build();

        let selected = select_devices(&devices, &query, &TimeZone::UTC);
        assert_eq!(names(&selected), vec!["Fridge"]);
    }

    #[test]
    fn test_search_and_status_combine() {
        let devices = fridge_and_heater();
        let query = DeviceQuery::builder()
            .status(StatusFilter::Off)
            .search("fri")
            .build();

        assert!(select_devices(&devices, &query, &TimeZone::UTC).is_empty());

        let query = DeviceQuery::builder()
            .status(StatusFilter::On)
            .search("FRI")
            .build();
        assert_eq!(
            names(&select_devices(&devices, &query, &TimeZone::UTC)),
            vec!["Fridge"]
        );
    }

    #[test]
    fn test_empty_query_returns_everything_sorted() {
        let devices = vec![
            device("1", "refrigerator", PowerStatus::On, "2025-01-01T10:00:00Z"),
            device("2", "Air Conditioner", PowerStatus::Off, "2025-01-01T08:00:00Z"),
            device("3", "desktop", PowerStatus::On, "2025-01-02T08:00:00Z"),
            device("4", "Boiler", PowerStatus::On, "2025-01-02T08:00:00Z"),
        ];

        let selected = select_devices(&devices, &DeviceQuery::default(), &TimeZone::UTC);
        assert_eq!(
            names(&selected),
            vec!["Air Conditioner", "Boiler", "desktop", "refrigerator"]
        );
    }

    #[test]
    fn test_equal_names_keep_collection_order() {
        let devices = vec![
            device("first", "Lamp", PowerStatus::On, "2025-01-01T10:00:00Z"),
            device("other", "Clock", PowerStatus::On, "2025-01-01T10:00:00Z"),
            device("second", "Lamp", PowerStatus::Off, "2025-01-01T11:00:00Z"),
        ];

        let selected = select_devices(&devices, &DeviceQuery::default(), &TimeZone::UTC);
        let ids: Vec<&str> = selected.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["other", "first", "second"]);
    }

    #[test]
    fn test_case_only_difference_puts_lowercase_first() {
        assert_eq!(compare_names("lamp", "Lamp"), Ordering::Less);
        assert_eq!(compare_names("Lamp", "lamp"), Ordering::Greater);
        assert_eq!(compare_names("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_names("Lamp", "Lamp"), Ordering::Equal);
    }

    #[test]
    fn test_malformed_devices_only_dropped_by_day_scope() {
        let mut devices = fridge_and_heater();
        devices.push(device("x", "Kettle", PowerStatus::On, "garbage"));

        let all_days = select_devices(&devices, &DeviceQuery::default(), &TimeZone::UTC);
        assert_eq!(names(&all_days), vec!["Fridge", "Heater", "Kettle"]);

        let one_day = DeviceQuery::builder().day(day("2025-01-01")).build();
        assert_eq!(
            names(&select_devices(&devices, &one_day, &TimeZone::UTC)),
            vec!["Fridge"]
        );
    }

    #[test]
    fn test_selection_is_a_pure_subset() {
        let devices = vec![
            device("1", "Heater", PowerStatus::On, "2025-01-01T10:00:00Z"),
            device("2", "heat pump", PowerStatus::Off, "2025-01-01T11:00:00Z"),
            device("3", "Fridge", PowerStatus::On, "2025-01-02T10:00:00Z"),
        ];
        let before = devices.clone();
        let query = DeviceQuery::builder()
            .day(day("2025-01-01"))
            .search("heat")
            .build();

        let first = select_devices(&devices, &query, &TimeZone::UTC);
        let second = select_devices(&devices, &query, &TimeZone::UTC);

        assert_eq!(first, second);
        assert!(first.iter().all(|d| devices.contains(d)));
        assert_eq!(names(&first), vec!["heat pump", "Heater"]);
        assert_eq!(devices, before);
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!("On".parse::<StatusFilter>().unwrap(), StatusFilter::On);
        assert!("dim".parse::<StatusFilter>().is_err());
    }
}
