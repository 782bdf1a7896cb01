use std::iter::Sum;
use std::ops::Add;

use jiff::tz::TimeZone;
use ordered_float::NotNan;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pipeline::in_day_scope;
use crate::{Device, DayKey, DeviceKind};

/// A finite, non-negative power reading in watts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Watts(NotNan<f64>);

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("invalid power reading {0}: expected a finite, non-negative number of watts")]
pub struct InvalidWatts(pub f64);

impl Watts {
    pub fn new(value: f64) -> Result<Self, InvalidWatts> {
        if !value.is_finite() || value < 0.0 {
            return Err(InvalidWatts(value));
        }
        NotNan::new(value).map(Watts).map_err(|_| InvalidWatts(value))
    }

    pub fn get(self) -> f64 {
        self.0.into_inner()
    }
}

impl Default for Watts {
    fn default() -> Self {
        Watts(NotNan::from(0u8))
    }
}

impl From<u32> for Watts {
    fn from(value: u32) -> Self {
        Watts(NotNan::from(value))
    }
}

impl TryFrom<f64> for Watts {
    type Error = InvalidWatts;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Watts::new(value)
    }
}

impl From<Watts> for f64 {
    fn from(watts: Watts) -> Self {
        watts.get()
    }
}

impl Add for Watts {
    type Output = Watts;

    fn add(self, rhs: Watts) -> Watts {
        Watts(self.0 + rhs.0)
    }
}

impl Sum for Watts {
    fn sum<I: Iterator<Item = Watts>>(iter: I) -> Self {
        iter.fold(Watts::default(), Add::add)
    }
}

/// Typical draw of an appliance category, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerRange {
    pub min: u32,
    pub max: u32,
}

impl DeviceKind {
    pub fn power_range(&self) -> Option<PowerRange> {
        let (min, max) = match self {
            DeviceKind::AirConditioner => (1000, 3000),
            DeviceKind::Refrigerator => (100, 400),
            DeviceKind::WashingMachine => (500, 2000),
            DeviceKind::Tv => (50, 300),
            DeviceKind::Lighting => (10, 100),
            DeviceKind::Heater => (1500, 2500),
            DeviceKind::Microwave => (800, 1500),
            DeviceKind::Computer => (200, 500),
            DeviceKind::Dishwasher => (1200, 2400),
            DeviceKind::Other(_) => return None,
        };
        Some(PowerRange { min, max })
    }
}

/// Plausible reading for a freshly added device: uniform within the
/// category's range, zero when the category has none.
pub fn random_power<R: Rng + ?Sized>(kind: &DeviceKind, rng: &mut R) -> Watts {
    match kind.power_range() {
        Some(range) => Watts::from(rng.random_range(range.min..=range.max)),
        None => Watts::default(),
    }
}

/// Total draw of a day scope and its heaviest consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSummary<'a> {
    pub total: Watts,
    /// Highest draw first; equal draws keep collection order.
    pub top: Vec<&'a Device>,
}

pub fn power_summary<'a>(
    devices: &'a [Device],
    day: Option<&DayKey>,
    limit: usize,
    tz: &TimeZone,
) -> PowerSummary<'a> {
    let mut scoped: Vec<&Device> = devices
        .iter()
        .filter(|device| in_day_scope(device, day, tz))
        .collect();

    let total = scoped.iter().map(|device| device.power()).sum();

    scoped.sort_by(|a, b| b.power().cmp(&a.power()));
    scoped.truncate(limit);

    PowerSummary { total, top: scoped }
}
