// libs/reminder-cell/src/services/sweeper.rs
//! Reminder sweep over upcoming calendar events.
//!
//! The sweep scans every active calendar for events starting inside a
//! tolerance window around `now + window_hours_ahead` and sends one reminder
//! per event. Idempotence comes from a private-metadata flag stamped on the
//! event only after its reminder was actually delivered; a sweep that dies
//! mid-run resends nothing it already flagged and retries everything else.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use availability_cell::ScheduleRepository;
use booking_cell::services::description::{self, DescriptionError};
use booking_cell::services::notify::{Notifier, ReminderMessage};
use calendar_cell::{CalendarApi, CalendarEvent, EventStatus};

use crate::models::{SweepParams, SweepReport, REMINDER_FLAG_KEY};

pub struct ReminderSweeper {
    schedules: Arc<ScheduleRepository>,
    calendar: Arc<dyn CalendarApi>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderSweeper {
    pub fn new(
        schedules: Arc<ScheduleRepository>,
        calendar: Arc<dyn CalendarApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            schedules,
            calendar,
            notifier,
        }
    }

    /// Runs one sweep. Per-calendar and per-event failures are counted and
    /// the sweep keeps going; the report is the only outcome.
    pub async fn sweep(&self, params: &SweepParams, now: DateTime<Utc>) -> SweepReport {
        let center = now + Duration::hours(params.window_hours_ahead);
        let window_start = center - Duration::hours(params.tolerance_hours);
        let window_end = center + Duration::hours(params.tolerance_hours);

        let mut report = SweepReport::empty(params.dry_run, window_start, window_end);

        for calendar_id in self.schedules.active_calendar_ids().await {
            let events = match self
                .calendar
                .list_events_in_range(&calendar_id, window_start, window_end)
                .await
            {
                Ok(events) => events,
                Err(e) => {
                    warn!(calendar_id, error = %e, "Calendar listing failed, skipping calendar");
                    report.failures += 1;
                    continue;
                }
            };

            for event in events {
                report.scanned += 1;
                self.process_event(&calendar_id, &event, now, params.dry_run, &mut report)
                    .await;
            }
        }

        info!(
            scanned = report.scanned,
            sent = report.sent,
            failures = report.failures,
            dry_run = report.dry_run,
            "Reminder sweep finished"
        );
        report
    }

    async fn process_event(
        &self,
        calendar_id: &str,
        event: &CalendarEvent,
        now: DateTime<Utc>,
        dry_run: bool,
        report: &mut SweepReport,
    ) {
        if event.status == EventStatus::Cancelled {
            report.skipped_cancelled += 1;
            return;
        }
        if event.private_metadata.contains_key(REMINDER_FLAG_KEY) {
            report.skipped_flagged += 1;
            return;
        }

        // A missing description decodes like free text: not an engine event.
        let text = event.description.as_deref().unwrap_or_default();
        let fields = match description::decode(text) {
            Ok(fields) => fields,
            Err(e @ DescriptionError::UnsupportedVersion(_)) => {
                debug!(event_id = %event.id, error = %e, "Skipping non-engine event");
                report.skipped_unparseable += 1;
                return;
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Skipping unparseable event description");
                report.skipped_unparseable += 1;
                return;
            }
        };

        if dry_run {
            report.sent += 1;
            return;
        }

        let message = ReminderMessage {
            patient_name: fields.patient_name,
            patient_email: fields.patient_email,
            doctor_id: fields.doctor_id,
            clinic_id: fields.clinic_id,
            starts_at: event.start,
        };
        if let Err(e) = self.notifier.send_reminder(&message).await {
            warn!(event_id = %event.id, error = %e, "Reminder delivery failed");
            report.failures += 1;
            return;
        }
        report.sent += 1;

        // Flag only after delivery. An unflagged delivered reminder risks a
        // duplicate next sweep; a flagged undelivered one loses the reminder
        // for good, which is the worse failure.
        let entries = HashMap::from([(REMINDER_FLAG_KEY.to_string(), now.to_rfc3339())]);
        if let Err(e) = self
            .calendar
            .patch_private_metadata(calendar_id, &event.id, entries)
            .await
        {
            warn!(event_id = %event.id, error = %e, "Sent reminder was not flagged");
            report.failures += 1;
        }
    }
}
