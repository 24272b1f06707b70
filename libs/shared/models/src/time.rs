//! Clinic-local civil time to UTC conversion.
//!
//! All public date/time fields in the API are clinic-local `YYYY-MM-DD` and
//! `HH:MM` strings; every comparison in the engine happens in UTC after one
//! of the conversions below. Local wall-clock values are never compared
//! directly across days or DST transitions.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Convert a clinic-local civil date + time into a UTC instant.
///
/// A wall-clock value that is ambiguous (clocks rolled back) resolves to the
/// earlier instant; one that does not exist (clocks sprang forward) yields
/// `None` and should be treated as invalid input.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// UTC bounds `[start, end)` of a full clinic-local day.
///
/// If midnight itself falls in a DST gap the boundary slides forward to the
/// first wall-clock hour that exists on that date.
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = first_valid_instant(date, tz)?;
    let end = first_valid_instant(date.succ_opt()?, tz)?;
    Some((start, end))
}

fn first_valid_instant(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    for hour in 0..3u32 {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
        if let Some(t) = local_to_utc(date, time, tz) {
            return Some(t);
        }
    }
    None
}

/// Serde helpers for `HH:MM` wall-clock fields.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for optional `HH:MM` wall-clock fields.
pub mod hhmm_option {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_some(&t.format(super::hhmm::FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            Some(s) => NaiveTime::parse_from_str(&s, super::hhmm::FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
