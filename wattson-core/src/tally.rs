use jiff::tz::TimeZone;
use serde::Serialize;

use crate::pipeline::in_day_scope;
use crate::{Device, DayKey, PowerStatus};

/// Device counts per power state within a day scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub all: usize,
    pub on: usize,
    pub off: usize,
}

/// Counts devices in the day scope. Status and search filters play no part.
pub fn tally_statuses(devices: &[Device], day: Option<&DayKey>, tz: &TimeZone) -> StatusTally {
    devices
        .iter()
        .filter(|device| in_day_scope(device, day, tz))
        .fold(StatusTally::default(), |mut tally, device| {
            tally.all += 1;
            match device.power_status {
                PowerStatus::On => tally.on += 1,
                PowerStatus::Off => tally.off += 1,
            }
            tally
        })
}
