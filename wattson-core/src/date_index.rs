use std::collections::BTreeSet;

use jiff::tz::TimeZone;

use crate::{Device, DayKey, day_of};

/// Distinct observation days present in `devices`, oldest first.
///
/// Devices whose `lastUpdated` cannot be normalized contribute no day.
pub fn build_date_index(devices: &[Device], tz: &TimeZone) -> Vec<DayKey> {
    devices
        .iter()
        .filter_map(|device| day_of(device, tz))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
