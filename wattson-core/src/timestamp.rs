use std::fmt;
use std::str::FromStr;

use jiff::civil::{self, Time};
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%d/%m/%y %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed timestamp: {0}")]
pub struct MalformedTimestamp(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid day key {0:?}, expected YYYY-MM-DD")]
pub struct InvalidDayKey(pub String);

/// A timestamp in whichever representation the store handed back.
///
/// Variant order matters for deserialization: a string that is a valid
/// RFC 3339 instant becomes [`RawTimestamp::Instant`], any other string is
/// kept as [`RawTimestamp::Text`] and only interpreted on normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Document-store native form.
    Native {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(alias = "_nanoseconds", default)]
        nanoseconds: i32,
    },
    /// Already-normalized instant.
    Instant(Timestamp),
    /// ISO-8601 text, with or without an offset.
    Text(String),
}

impl RawTimestamp {
    /// Converts to a canonical instant.
    ///
    /// Text without an offset is a wall-clock reading in `tz`.
    pub fn normalize(&self, tz: &TimeZone) -> Result<Timestamp, MalformedTimestamp> {
        match self {
            RawTimestamp::Instant(ts) => Ok(*ts),
            RawTimestamp::Native {
                seconds,
                nanoseconds,
            } => Timestamp::new(*seconds, *nanoseconds)
                .map_err(|e| MalformedTimestamp(format!("{seconds}s/{nanoseconds}ns: {e}"))),
            RawTimestamp::Text(text) => parse_text(text, tz),
        }
    }

    pub fn day_key(&self, tz: &TimeZone) -> Result<DayKey, MalformedTimestamp> {
        self.normalize(tz).map(|ts| DayKey::of(ts, tz))
    }
}

impl From<Timestamp> for RawTimestamp {
    fn from(ts: Timestamp) -> Self {
        RawTimestamp::Instant(ts)
    }
}

fn parse_text(text: &str, tz: &TimeZone) -> Result<Timestamp, MalformedTimestamp> {
    let trimmed = text.trim();
    if let Ok(ts) = trimmed.parse::<Timestamp>() {
        return Ok(ts);
    }

    let wall_clock = trimmed
        .parse::<civil::DateTime>()
        .or_else(|_| {
            trimmed
                .parse::<civil::Date>()
                .map(|date| date.to_datetime(Time::midnight()))
        })
        .map_err(|e| MalformedTimestamp(format!("{text:?}: {e}")))?;

    wall_clock
        .to_zoned(tz.clone())
        .map(|zoned| zoned.timestamp())
        .map_err(|e| MalformedTimestamp(format!("{text:?}: {e}")))
}

/// Calendar day (`YYYY-MM-DD`) of an instant in the local zone.
///
/// Ordering follows the calendar, which for this format is also the
/// lexicographic order of the rendered keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(pub civil::Date);

impl DayKey {
    pub fn of(ts: Timestamp, tz: &TimeZone) -> Self {
        DayKey(ts.to_zoned(tz.clone()).date())
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.strftime(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = InvalidDayKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let is_shaped = s.len() == 10
            && s.bytes().enumerate().all(|(i, b)| match i {
                4 | 7 => b == b'-',
                _ => b.is_ascii_digit(),
            });
        if !is_shaped {
            return Err(InvalidDayKey(s.to_string()));
        }

        s.parse::<civil::Date>()
            .map(DayKey)
            .map_err(|_| InvalidDayKey(s.to_string()))
    }
}

impl TryFrom<String> for DayKey {
    type Error = InvalidDayKey;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DayKey> for String {
    fn from(day: DayKey) -> Self {
        day.to_string()
    }
}

/// Renders an instant as `DD/MM/YY HH:MM:SS` in the local zone.
pub fn format_display(ts: Timestamp, tz: &TimeZone) -> String {
    ts.to_zoned(tz.clone()).strftime(DISPLAY_FORMAT).to_string()
}

/// Smallest instant strictly after `previous` and not before `floor`,
/// preferring `now` when it already satisfies both.
pub fn next_stamp(now: Timestamp, previous: Option<Timestamp>, floor: Option<Timestamp>) -> Timestamp {
    let after_previous = previous
        .and_then(|prev| prev.checked_add(SignedDuration::from_nanos(1)).ok())
        .unwrap_or(now);

    [Some(now), Some(after_previous), floor]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use jiff::tz;

    use super::*;

    fn text(s: &str) -> RawTimestamp {
        RawTimestamp::Text(s.to_string())
    }

    #[test]
    fn test_text_with_offset_is_absolute() {
        let plus_two = TimeZone::fixed(tz::offset(2));
        let ts = text("2025-01-01T10:00:00Z").normalize(&plus_two).unwrap();

        assert_eq!(ts, "2025-01-01T10:00:00Z".parse::<Timestamp>().unwrap());
    }

    #[test]
    fn test_text_without_offset_is_local_wall_clock() {
        let plus_two = TimeZone::fixed(tz::offset(2));
        let ts = text("2025-01-01T01:00:00").normalize(&plus_two).unwrap();

        assert_eq!(ts, "2024-12-31T23:00:00Z".parse::<Timestamp>().unwrap());
        assert_eq!(
            text("2025-01-01T01:00:00").day_key(&plus_two).unwrap(),
            DayKey(date(2025, 1, 1))
        );
    }

    #[test]
    fn test_date_only_text_is_local_midnight() {
        let ts = text("2025-01-02").normalize(&TimeZone::UTC).unwrap();
        assert_eq!(ts, "2025-01-02T00:00:00Z".parse::<Timestamp>().unwrap());
    }

    #[test]
    fn test_native_seconds_and_nanoseconds() {
        let raw = RawTimestamp::Native {
            seconds: 1_735_725_600,
            nanoseconds: 500,
        };
        let ts = raw.normalize(&TimeZone::UTC).unwrap();

        assert_eq!(ts.as_second(), 1_735_725_600);
        assert_eq!(ts.subsec_nanosecond(), 500);
    }

    #[test]
    fn test_malformed_inputs_fail() {
        assert!(text("yesterday-ish").normalize(&TimeZone::UTC).is_err());
        assert!(text("").normalize(&TimeZone::UTC).is_err());
        assert!(text("2025-13-45T10:00:00Z").normalize(&TimeZone::UTC).is_err());

        let out_of_range = RawTimestamp::Native {
            seconds: i64::MAX,
            nanoseconds: 0,
        };
        assert!(out_of_range.normalize(&TimeZone::UTC).is_err());
    }

    #[test]
    fn test_day_key_uses_local_calendar() {
        let ts: Timestamp = "2025-01-01T23:30:00Z".parse().unwrap();

        assert_eq!(DayKey::of(ts, &TimeZone::UTC).to_string(), "2025-01-01");
        assert_eq!(
            DayKey::of(ts, &TimeZone::fixed(tz::offset(2))).to_string(),
            "2025-01-02"
        );
    }

    #[test]
    fn test_day_key_parse_is_strict() {
        assert_eq!("2025-01-02".parse::<DayKey>().unwrap(), DayKey(date(2025, 1, 2)));
        assert!("2025-1-2".parse::<DayKey>().is_err());
        assert!("2025-02-30".parse::<DayKey>().is_err());
        assert!("02/01/2025".parse::<DayKey>().is_err());
    }

    #[test]
    fn test_deserialize_prefers_instant_for_rfc3339() {
        let instant: RawTimestamp = serde_json::from_str(r#""2025-01-01T10:00:00Z""#).unwrap();
        assert!(matches!(instant, RawTimestamp::Instant(_)));

        let wall_clock: RawTimestamp = serde_json::from_str(r#""2025-01-01T08:32:15""#).unwrap();
        assert_eq!(wall_clock, text("2025-01-01T08:32:15"));

        let native: RawTimestamp =
            serde_json::from_str(r#"{"_seconds": 10, "_nanoseconds": 3}"#).unwrap();
        assert_eq!(
            native,
            RawTimestamp::Native {
                seconds: 10,
                nanoseconds: 3
            }
        );
    }

    #[test]
    fn test_display_format() {
        let ts: Timestamp = "2025-01-01T08:32:15Z".parse().unwrap();
        assert_eq!(format_display(ts, &TimeZone::UTC), "01/01/25 08:32:15");
        assert_eq!(
            format_display(ts, &TimeZone::fixed(tz::offset(-9))),
            "31/12/24 23:32:15"
        );
    }

    #[test]
    fn test_next_stamp_is_strictly_later() {
        let now: Timestamp = "2025-01-01T10:00:00Z".parse().unwrap();
        let later: Timestamp = "2025-01-01T12:00:00Z".parse().unwrap();

        assert_eq!(next_stamp(now, None, None), now);
        assert_eq!(next_stamp(now, Some(now), None), now + SignedDuration::from_nanos(1));
        assert_eq!(next_stamp(now, Some(later), None), later + SignedDuration::from_nanos(1));
        assert_eq!(next_stamp(now, None, Some(later)), later);
    }
}
