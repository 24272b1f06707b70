// libs/booking-cell/src/services/commit.rs
//! Booking commit pipeline.
//!
//! The calendar event is the single source of truth for a reservation. A
//! commit therefore runs: create a `pending` shadow row, re-check free/busy
//! against the live calendar, create the event, then settle the shadow row
//! and side effects. Anything between the re-check and event creation can
//! still race another writer, so the re-check is best-effort protection and
//! the calendar itself is the arbiter.

use std::sync::Arc;

use chrono::Duration;
use chrono_tz::Tz;
use tracing::{error, info, warn};

use availability_cell::{validate_duration, ScheduleRepository};
use calendar_cell::{CalendarApi, CalendarError, EventWindow, NewEvent};
use shared_models::time::local_to_utc;

use crate::models::{
    BookingConfirmation, BookingError, BookingIntake, BookingRequest, CancelRequest,
    IntakeStatus, RescheduleRequest, FOLLOW_UP_WINDOW_DAYS,
};
use crate::services::description::{encode, DescriptionFields};
use crate::services::intake::IntakeStore;
use crate::services::notify::{ConfirmationMessage, Notifier};

pub struct BookingCoordinator {
    schedules: Arc<ScheduleRepository>,
    calendar: Arc<dyn CalendarApi>,
    intakes: Arc<dyn IntakeStore>,
    notifier: Arc<dyn Notifier>,
    timezone: Tz,
}

impl BookingCoordinator {
    pub fn new(
        schedules: Arc<ScheduleRepository>,
        calendar: Arc<dyn CalendarApi>,
        intakes: Arc<dyn IntakeStore>,
        notifier: Arc<dyn Notifier>,
        timezone: Tz,
    ) -> Self {
        Self {
            schedules,
            calendar,
            intakes,
            notifier,
            timezone,
        }
    }

    /// Commits a booking: shadow row first, then a fresh free/busy check,
    /// then the calendar event. A conflict or calendar failure after the
    /// shadow row exists marks it `failed` rather than deleting it, so the
    /// attempt stays auditable.
    pub async fn commit_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, BookingError> {
        validate_duration(request.duration_minutes)
            .map_err(|e| BookingError::InvalidInput(e.to_string()))?;

        let mapping = self
            .schedules
            .get_schedule_mapping(&request.doctor_id, &request.clinic_id)
            .await
            .ok_or(BookingError::ScheduleNotFound)?;

        let starts_at = local_to_utc(request.date, request.time, self.timezone).ok_or_else(|| {
            BookingError::InvalidInput(format!(
                "{} {} is not a valid local time in {}",
                request.date,
                request.time.format("%H:%M"),
                self.timezone
            ))
        })?;
        let ends_at = starts_at + Duration::minutes(request.duration_minutes);

        let intake = BookingIntake::new_pending(request, &mapping.calendar_id, starts_at, ends_at);
        self.intakes
            .create_intake(&intake)
            .await
            .map_err(|e| BookingError::Datastore(e.to_string()))?;

        // The slot list the patient saw may be stale. Re-validate against
        // the live calendar; a check failure fails the commit rather than
        // risking a double booking.
        let busy = match self
            .calendar
            .get_free_busy(&mapping.calendar_id, starts_at, ends_at)
            .await
        {
            Ok(busy) => busy,
            Err(e) => {
                self.fail_intake(intake.id).await;
                return Err(map_calendar_error(e));
            }
        };
        if busy.iter().any(|b| b.overlaps(starts_at, ends_at)) {
            self.fail_intake(intake.id).await;
            return Err(BookingError::SlotTaken);
        }

        let description = encode(&DescriptionFields {
            patient_name: request.patient.name.clone(),
            patient_email: request.patient.email.clone(),
            doctor_id: request.doctor_id.clone(),
            clinic_id: request.clinic_id.clone(),
            duration_minutes: request.duration_minutes,
        });
        let event = match self
            .calendar
            .create_event(
                &mapping.calendar_id,
                NewEvent {
                    summary: format!("Appointment: {}", request.patient.name),
                    description,
                    start: starts_at,
                    end: ends_at,
                },
            )
            .await
        {
            Ok(event) => event,
            Err(e) => {
                self.fail_intake(intake.id).await;
                return Err(map_calendar_error(e));
            }
        };

        info!(
            event_id = %event.id,
            doctor_id = %request.doctor_id,
            clinic_id = %request.clinic_id,
            starts_at = %starts_at,
            "Booking committed"
        );

        // Side effects past this point never fail the booking. The event
        // exists; the patient has their slot.
        if let Err(e) = self
            .notifier
            .send_confirmation(&ConfirmationMessage {
                patient_name: request.patient.name.clone(),
                patient_email: request.patient.email.clone(),
                doctor_id: request.doctor_id.clone(),
                clinic_id: request.clinic_id.clone(),
                starts_at,
                ends_at,
            })
            .await
        {
            warn!(error = %e, event_id = %event.id, "Booking confirmation was not delivered");
        }

        self.adopt_follow_up(request, &event.id).await;

        if let Err(e) = self
            .intakes
            .set_status(intake.id, IntakeStatus::Confirmed, Some(event.id.clone()))
            .await
        {
            error!(
                error = %e,
                intake_id = %intake.id,
                event_id = %event.id,
                "Booked event has no confirmed intake row"
            );
        }

        Ok(BookingConfirmation {
            event_id: event.id,
            intake_id: Some(intake.id),
            starts_at,
            ends_at,
        })
    }

    /// Moves an existing event to a new window after re-validating the
    /// destination. Busy intervals lying entirely inside the event's current
    /// window belong to the event being moved and are not conflicts.
    pub async fn reschedule_booking(
        &self,
        event_id: &str,
        request: &RescheduleRequest,
    ) -> Result<BookingConfirmation, BookingError> {
        validate_duration(request.duration_minutes)
            .map_err(|e| BookingError::InvalidInput(e.to_string()))?;

        let starts_at =
            local_to_utc(request.new_date, request.new_time, self.timezone).ok_or_else(|| {
                BookingError::InvalidInput(format!(
                    "{} {} is not a valid local time in {}",
                    request.new_date,
                    request.new_time.format("%H:%M"),
                    self.timezone
                ))
            })?;
        let ends_at = starts_at + Duration::minutes(request.duration_minutes);

        let current = self
            .calendar
            .get_event(&request.calendar_id, event_id)
            .await
            .map_err(map_calendar_error)?;
        let old = current.window();

        let busy = self
            .calendar
            .get_free_busy(&request.calendar_id, starts_at, ends_at)
            .await
            .map_err(map_calendar_error)?;
        let conflict = busy
            .iter()
            .filter(|b| !(b.start >= old.start && b.end <= old.end))
            .any(|b| b.overlaps(starts_at, ends_at));
        if conflict {
            return Err(BookingError::SlotTaken);
        }

        self.calendar
            .update_event(
                &request.calendar_id,
                event_id,
                EventWindow {
                    start: starts_at,
                    end: ends_at,
                },
            )
            .await
            .map_err(map_calendar_error)?;

        info!(event_id, starts_at = %starts_at, "Booking rescheduled");

        let intake_id = match self.intakes.find_by_event(event_id).await {
            Ok(Some(intake)) => {
                if let Err(e) = self.intakes.update_window(intake.id, starts_at, ends_at).await {
                    warn!(error = %e, intake_id = %intake.id, "Intake window was not updated");
                }
                Some(intake.id)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, event_id, "Intake lookup failed after reschedule");
                None
            }
        };

        Ok(BookingConfirmation {
            event_id: event_id.to_string(),
            intake_id,
            starts_at,
            ends_at,
        })
    }

    /// Deletes the calendar event and cancels the shadow row. An event the
    /// provider no longer knows is treated as already cancelled.
    pub async fn cancel_booking(
        &self,
        event_id: &str,
        request: &CancelRequest,
    ) -> Result<(), BookingError> {
        match self.calendar.delete_event(&request.calendar_id, event_id).await {
            Ok(()) => {}
            Err(CalendarError::EventNotFound(_)) => {
                info!(event_id, "Cancel for an event the provider no longer has");
            }
            Err(e) => return Err(map_calendar_error(e)),
        }

        match self.intakes.find_by_event(event_id).await {
            Ok(Some(intake)) => {
                if let Err(e) = self
                    .intakes
                    .set_status(intake.id, IntakeStatus::Cancelled, None)
                    .await
                {
                    warn!(error = %e, intake_id = %intake.id, "Intake was not marked cancelled");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, event_id, "Intake lookup failed after cancel"),
        }

        info!(event_id, "Booking cancelled");
        Ok(())
    }

    /// A new booking adopts the patient's nearest pending follow-up plan
    /// when one is suggested close to the booked date.
    async fn adopt_follow_up(&self, request: &BookingRequest, event_id: &str) {
        let plans = match self
            .intakes
            .pending_follow_ups_near(&request.patient.email, request.date, FOLLOW_UP_WINDOW_DAYS)
            .await
        {
            Ok(plans) => plans,
            Err(e) => {
                warn!(error = %e, "Follow-up plan lookup failed");
                return;
            }
        };

        if let Some(plan) = plans.first() {
            match self.intakes.mark_follow_up_booked(plan.id, event_id).await {
                Ok(()) => info!(plan_id = %plan.id, event_id, "Follow-up plan adopted"),
                Err(e) => warn!(error = %e, plan_id = %plan.id, "Follow-up plan was not adopted"),
            }
        }
    }

    async fn fail_intake(&self, intake_id: uuid::Uuid) {
        if let Err(e) = self
            .intakes
            .set_status(intake_id, IntakeStatus::Failed, None)
            .await
        {
            warn!(error = %e, intake_id = %intake_id, "Intake was not marked failed");
        }
    }
}

fn map_calendar_error(error: CalendarError) -> BookingError {
    match error {
        CalendarError::EventNotFound(event_id) => BookingError::NotFound(event_id),
        other => BookingError::Calendar(other.to_string()),
    }
}
