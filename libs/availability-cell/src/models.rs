// libs/availability-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use calendar_cell::CalendarError;
use shared_models::time::{hhmm, hhmm_option};

// ==============================================================================
// ENGINE-WIDE CONSTANTS
// ==============================================================================

/// Candidate slots start on a fixed 15-minute grid. Deliberately not
/// configurable per practitioner: predictability over flexibility.
pub const SLOT_INCREMENT_MINUTES: i64 = 15;

/// Same-day bookings require this much lead time from "now" in clinic time.
pub const SAME_DAY_BUFFER_MINUTES: i64 = 60;

pub const MIN_DURATION_MINUTES: i64 = 5;
pub const MAX_DURATION_MINUTES: i64 = 240;

/// Known practitioner/location identifiers. Lookups for anything outside
/// these enumerations return "absent" without touching storage.
pub const KNOWN_DOCTOR_IDS: &[&str] = &["dr-adams", "dr-bell", "dr-costa"];
pub const KNOWN_CLINIC_IDS: &[&str] = &["main-clinic", "north-clinic"];

// ==============================================================================
// WEEKLY SCHEDULE
// ==============================================================================

/// One open range of clinic-local wall-clock time within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayOpenRanges {
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub ranges: Vec<TimeRange>,
}

/// Recurring weekly schedule. Ranges within a day must be non-overlapping
/// and ordered by start time; a missing day is closed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklySchedule(pub Vec<DayOpenRanges>);

impl WeeklySchedule {
    pub fn open_ranges(&self, day_of_week: u8) -> &[TimeRange] {
        self.0
            .iter()
            .find(|d| d.day_of_week == day_of_week)
            .map(|d| d.ranges.as_slice())
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<(), String> {
        for day in &self.0 {
            if day.day_of_week > 6 {
                return Err(format!("day_of_week out of range: {}", day.day_of_week));
            }
            let mut previous_end: Option<NaiveTime> = None;
            for range in &day.ranges {
                if range.start >= range.end {
                    return Err(format!(
                        "empty or inverted range on day {}: {}-{}",
                        day.day_of_week, range.start, range.end
                    ));
                }
                if let Some(prev) = previous_end {
                    if range.start < prev {
                        return Err(format!(
                            "overlapping or unordered ranges on day {}",
                            day.day_of_week
                        ));
                    }
                }
                previous_end = Some(range.end);
            }
        }
        Ok(())
    }
}

// ==============================================================================
// SCHEDULE MAPPING
// ==============================================================================

/// Authoritative (practitioner, location) record: which external calendar to
/// consult and the recurring weekly schedule to walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleMapping {
    pub doctor_id: String,
    pub clinic_id: String,
    pub calendar_id: String,
    pub weekly_schedule: WeeklySchedule,
    pub is_active: bool,
}

impl ScheduleMapping {
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.calendar_id.is_empty()
    }
}

// ==============================================================================
// HOLIDAY BLOCKS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayScope {
    Doctor,
    Clinic,
    Both,
}

/// Full- or partial-day exclusion independent of the weekly schedule.
/// A block missing either time bound closes the entire day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayBlock {
    pub scope: HolidayScope,
    pub doctor_id: Option<String>,
    pub clinic_id: Option<String>,
    pub date: NaiveDate,
    #[serde(default, with = "hhmm_option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_option")]
    pub end_time: Option<NaiveTime>,
}

impl HolidayBlock {
    pub fn is_full_day(&self) -> bool {
        self.start_time.is_none() || self.end_time.is_none()
    }

    pub fn applies_to(&self, doctor_id: &str, clinic_id: &str) -> bool {
        let doctor_matches = self.doctor_id.as_deref() == Some(doctor_id);
        let clinic_matches = self.clinic_id.as_deref() == Some(clinic_id);
        match self.scope {
            HolidayScope::Doctor => doctor_matches,
            HolidayScope::Clinic => clinic_matches,
            HolidayScope::Both => doctor_matches && clinic_matches,
        }
    }
}

// ==============================================================================
// SLOT LISTING
// ==============================================================================

/// Result of a slot-generation call. Closed days are not errors: the listing
/// carries the closed/holiday flags with an empty slot list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotListing {
    pub date: NaiveDate,
    pub doctor_id: String,
    pub clinic_id: String,
    pub duration_minutes: i64,
    pub is_closed: bool,
    pub is_holiday: bool,
    /// Bookable start times as clinic-local `HH:MM`, chronological.
    pub slots: Vec<String>,
}

impl SlotListing {
    pub fn closed(
        date: NaiveDate,
        doctor_id: &str,
        clinic_id: &str,
        duration_minutes: i64,
        is_holiday: bool,
    ) -> Self {
        Self {
            date,
            doctor_id: doctor_id.to_string(),
            clinic_id: clinic_id.to_string(),
            duration_minutes,
            is_closed: true,
            is_holiday,
            slots: Vec::new(),
        }
    }

    pub fn open(
        date: NaiveDate,
        doctor_id: &str,
        clinic_id: &str,
        duration_minutes: i64,
        slots: Vec<String>,
    ) -> Self {
        Self {
            date,
            doctor_id: doctor_id.to_string(),
            clinic_id: clinic_id.to_string(),
            duration_minutes,
            is_closed: false,
            is_holiday: false,
            slots,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("no active schedule mapping for this doctor and clinic")]
    NotBookable,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("calendar provider error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("datastore error: {0}")]
    Datastore(String),
}

pub fn validate_duration(duration_minutes: i64) -> Result<(), AvailabilityError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(AvailabilityError::InvalidInput(format!(
            "duration must be between {} and {} minutes",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekly_schedule_rejects_overlapping_ranges() {
        let schedule = WeeklySchedule(vec![DayOpenRanges {
            day_of_week: 1,
            ranges: vec![
                TimeRange { start: hm(9, 0), end: hm(12, 0) },
                TimeRange { start: hm(11, 0), end: hm(17, 0) },
            ],
        }]);
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn weekly_schedule_accepts_ordered_ranges_and_missing_days() {
        let schedule = WeeklySchedule(vec![DayOpenRanges {
            day_of_week: 1,
            ranges: vec![
                TimeRange { start: hm(9, 0), end: hm(12, 0) },
                TimeRange { start: hm(14, 0), end: hm(17, 0) },
            ],
        }]);
        assert!(schedule.validate().is_ok());
        assert!(schedule.open_ranges(0).is_empty());
        assert_eq!(schedule.open_ranges(1).len(), 2);
    }

    #[test]
    fn full_day_block_requires_both_bounds_to_be_partial() {
        let mut block = HolidayBlock {
            scope: HolidayScope::Both,
            doctor_id: Some("dr-adams".to_string()),
            clinic_id: Some("main-clinic".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            start_time: Some(hm(10, 0)),
            end_time: None,
        };
        assert!(block.is_full_day());

        block.end_time = Some(hm(11, 0));
        assert!(!block.is_full_day());
    }

    #[test]
    fn block_scope_controls_applicability() {
        let block = HolidayBlock {
            scope: HolidayScope::Clinic,
            doctor_id: None,
            clinic_id: Some("main-clinic".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            start_time: None,
            end_time: None,
        };
        assert!(block.applies_to("dr-adams", "main-clinic"));
        assert!(block.applies_to("dr-bell", "main-clinic"));
        assert!(!block.applies_to("dr-adams", "north-clinic"));
    }
}
