// libs/availability-cell/src/services/slots.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use calendar_cell::{BusyInterval, CalendarApi};
use shared_models::time::{local_day_bounds, local_to_utc};

use crate::models::{
    validate_duration, AvailabilityError, HolidayBlock, SlotListing, TimeRange,
    SAME_DAY_BUFFER_MINUTES, SLOT_INCREMENT_MINUTES,
};
use crate::services::holiday::{has_full_day_block, HolidayResolver};
use crate::services::schedule::ScheduleRepository;

/// Turns schedule + holidays + live busy intervals into bookable start times.
///
/// Cheap checks run first: the external calendar is only consulted once the
/// mapping exists, the day is not a holiday, and the weekday has open ranges.
pub struct SlotGenerator {
    schedules: Arc<ScheduleRepository>,
    holidays: Arc<HolidayResolver>,
    calendar: Arc<dyn CalendarApi>,
    timezone: Tz,
}

impl SlotGenerator {
    pub fn new(
        schedules: Arc<ScheduleRepository>,
        holidays: Arc<HolidayResolver>,
        calendar: Arc<dyn CalendarApi>,
        timezone: Tz,
    ) -> Self {
        Self {
            schedules,
            holidays,
            calendar,
            timezone,
        }
    }

    /// `date` is the clinic-local civil date; `now` is the caller's current
    /// instant, passed in so tests pin it and repeated calls are idempotent.
    pub async fn generate_slots(
        &self,
        date: NaiveDate,
        doctor_id: &str,
        clinic_id: &str,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<SlotListing, AvailabilityError> {
        validate_duration(duration_minutes)?;

        let mapping = self
            .schedules
            .get_schedule_mapping(doctor_id, clinic_id)
            .await
            .ok_or(AvailabilityError::NotBookable)?;

        let blocks = self
            .holidays
            .get_applicable_blocks(date, doctor_id, clinic_id)
            .await;
        if has_full_day_block(&blocks) {
            debug!("{} is fully blocked for ({}, {})", date, doctor_id, clinic_id);
            return Ok(SlotListing::closed(date, doctor_id, clinic_id, duration_minutes, true));
        }

        // Weekday of the clinic-local civil date. The date arrives as a
        // plain civil date, never parsed through UTC, so dates near midnight
        // cannot shift to the wrong weekday.
        let day_of_week = date.weekday().num_days_from_sunday() as u8;
        let open_ranges = mapping.weekly_schedule.open_ranges(day_of_week);
        if open_ranges.is_empty() {
            return Ok(SlotListing::closed(date, doctor_id, clinic_id, duration_minutes, false));
        }

        let (day_start, day_end) = local_day_bounds(date, self.timezone).ok_or_else(|| {
            AvailabilityError::InvalidInput(format!(
                "date {} is not representable in the clinic timezone",
                date
            ))
        })?;
        let busy = self
            .calendar
            .get_free_busy(&mapping.calendar_id, day_start, day_end)
            .await?;

        let blocked = partial_block_intervals(&blocks, self.timezone);

        let is_today = now.with_timezone(&self.timezone).date_naive() == date;
        let earliest_start = is_today.then(|| now + Duration::minutes(SAME_DAY_BUFFER_MINUTES));

        let mut starts: Vec<DateTime<Utc>> = Vec::new();
        for range in open_ranges {
            let Some((range_start, range_end)) = range_bounds_utc(date, range, self.timezone)
            else {
                continue;
            };
            starts.extend(walk_range(
                range_start,
                range_end,
                duration_minutes,
                &busy,
                &blocked,
                earliest_start,
            ));
        }

        let slots = starts
            .iter()
            .map(|s| s.with_timezone(&self.timezone).format("%H:%M").to_string())
            .collect();

        Ok(SlotListing::open(date, doctor_id, clinic_id, duration_minutes, slots))
    }
}

fn range_bounds_utc(
    date: NaiveDate,
    range: &TimeRange,
    tz: Tz,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = local_to_utc(date, range.start, tz)?;
    let end = local_to_utc(date, range.end, tz)?;
    (start < end).then_some((start, end))
}

/// Sub-range holiday blocks as UTC intervals; full-day blocks are handled
/// before this point, and blocks falling in a DST gap are skipped.
fn partial_block_intervals(blocks: &[HolidayBlock], tz: Tz) -> Vec<BusyInterval> {
    blocks
        .iter()
        .filter_map(|b| {
            let (start_time, end_time) = (b.start_time?, b.end_time?);
            let start = local_to_utc(b.date, start_time, tz)?;
            let end = local_to_utc(b.date, end_time, tz)?;
            (start < end).then_some(BusyInterval { start, end })
        })
        .collect()
}

/// Walk one open range in fixed increments, emitting every start whose
/// half-open window fits the range, clears the same-day lead time, and
/// touches no busy or blocked interval. Partial-fit slots at the range tail
/// are never offered.
fn walk_range(
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    duration_minutes: i64,
    busy: &[BusyInterval],
    blocked: &[BusyInterval],
    earliest_start: Option<DateTime<Utc>>,
) -> Vec<DateTime<Utc>> {
    let step = Duration::minutes(SLOT_INCREMENT_MINUTES);
    let duration = Duration::minutes(duration_minutes);

    let mut slots = Vec::new();
    let mut slot_start = range_start;

    loop {
        let slot_end = slot_start + duration;
        if slot_end > range_end {
            break;
        }

        let too_soon = earliest_start.is_some_and(|e| slot_start < e);
        let conflicted = busy
            .iter()
            .chain(blocked.iter())
            .any(|b| b.overlaps(slot_start, slot_end));

        if !too_soon && !conflicted {
            slots.push(slot_start);
        }

        slot_start += step;
    }

    slots
}
