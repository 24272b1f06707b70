use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use mockall::Sequence;
use uuid::Uuid;

use availability_cell::models::{
    DayOpenRanges, ScheduleMapping, TimeRange, WeeklySchedule,
};
use availability_cell::{ScheduleRepository, ScheduleStore, SystemClock};
use booking_cell::{
    BookingCoordinator, BookingError, BookingIntake, BookingRequest, CancelRequest,
    FollowUpPlan, FollowUpStatus, IntakeStatus, MockIntakeStore, MockNotifier, PatientContact,
    RescheduleRequest,
};
use calendar_cell::{
    BusyInterval, CalendarError, CalendarEvent, EventStatus, MockCalendarApi,
};

const TZ: &str = "Asia/Tokyo";

/// Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 10:00 clinic time on the requested Monday is 01:00 UTC in Asia/Tokyo.
fn booked_start_utc() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 1, 0, 0).unwrap()
}

struct FixedStore(Vec<ScheduleMapping>);

#[async_trait]
impl ScheduleStore for FixedStore {
    async fn load_active_mappings(&self) -> anyhow::Result<Vec<ScheduleMapping>> {
        Ok(self.0.clone())
    }
}

fn monday_mapping() -> ScheduleMapping {
    ScheduleMapping {
        doctor_id: "dr-adams".to_string(),
        clinic_id: "main-clinic".to_string(),
        calendar_id: "cal-adams-main".to_string(),
        weekly_schedule: WeeklySchedule(vec![DayOpenRanges {
            day_of_week: 1,
            ranges: vec![TimeRange { start: hm(9, 0), end: hm(12, 0) }],
        }]),
        is_active: true,
    }
}

fn repository() -> Arc<ScheduleRepository> {
    Arc::new(ScheduleRepository::new(
        Arc::new(FixedStore(vec![monday_mapping()])),
        Arc::new(SystemClock),
        Duration::from_secs(120),
    ))
}

fn coordinator(
    calendar: MockCalendarApi,
    intakes: MockIntakeStore,
    notifier: MockNotifier,
) -> BookingCoordinator {
    let tz: Tz = TZ.parse().unwrap();
    BookingCoordinator::new(
        repository(),
        Arc::new(calendar),
        Arc::new(intakes),
        Arc::new(notifier),
        tz,
    )
}

fn request() -> BookingRequest {
    BookingRequest {
        doctor_id: "dr-adams".to_string(),
        clinic_id: "main-clinic".to_string(),
        date: monday(),
        time: hm(10, 0),
        duration_minutes: 30,
        patient: PatientContact {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        },
    }
}

fn created_event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        summary: Some("Appointment: Ada Lovelace".to_string()),
        description: None,
        start,
        end,
        status: EventStatus::Confirmed,
        private_metadata: HashMap::new(),
    }
}

fn existing_intake(event_id: &str) -> BookingIntake {
    BookingIntake {
        id: Uuid::new_v4(),
        doctor_id: "dr-adams".to_string(),
        clinic_id: "main-clinic".to_string(),
        calendar_id: "cal-adams-main".to_string(),
        patient_name: "Ada Lovelace".to_string(),
        patient_email: "ada@example.com".to_string(),
        starts_at: booked_start_utc(),
        ends_at: booked_start_utc() + chrono::Duration::minutes(30),
        status: IntakeStatus::Confirmed,
        event_id: Some(event_id.to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn quiet_notifier() -> MockNotifier {
    let mut notifier = MockNotifier::new();
    notifier.expect_send_confirmation().returning(|_| Ok(()));
    notifier
}

fn no_follow_ups(intakes: &mut MockIntakeStore) {
    intakes
        .expect_pending_follow_ups_near()
        .returning(|_, _, _| Ok(vec![]));
}

#[tokio::test]
async fn commit_creates_event_and_confirms_intake() {
    let mut calendar = MockCalendarApi::new();
    calendar.expect_get_free_busy().returning(|_, _, _| Ok(vec![]));
    calendar
        .expect_create_event()
        .withf(|calendar_id, event| {
            calendar_id == "cal-adams-main"
                && event.start == booked_start_utc()
                && event.end == booked_start_utc() + chrono::Duration::minutes(30)
        })
        .times(1)
        .returning(|_, event| Ok(created_event("evt-1", event.start, event.end)));

    let mut intakes = MockIntakeStore::new();
    intakes
        .expect_create_intake()
        .withf(|intake| intake.status == IntakeStatus::Pending && intake.event_id.is_none())
        .times(1)
        .returning(|_| Ok(()));
    no_follow_ups(&mut intakes);
    intakes
        .expect_set_status()
        .withf(|_, status, event_id| {
            *status == IntakeStatus::Confirmed && event_id.as_deref() == Some("evt-1")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let coordinator = coordinator(calendar, intakes, quiet_notifier());
    let confirmation = coordinator.commit_booking(&request()).await.unwrap();

    assert_eq!(confirmation.event_id, "evt-1");
    assert!(confirmation.intake_id.is_some());
    assert_eq!(confirmation.starts_at, booked_start_utc());
}

#[tokio::test]
async fn taken_slot_fails_the_intake_and_never_creates_an_event() {
    let mut calendar = MockCalendarApi::new();
    calendar.expect_get_free_busy().returning(|_, _, _| {
        Ok(vec![BusyInterval {
            start: booked_start_utc(),
            end: booked_start_utc() + chrono::Duration::minutes(15),
        }])
    });
    // No create_event expectation: reaching it fails the test.

    let mut intakes = MockIntakeStore::new();
    intakes.expect_create_intake().returning(|_| Ok(()));
    intakes
        .expect_set_status()
        .withf(|_, status, event_id| *status == IntakeStatus::Failed && event_id.is_none())
        .times(1)
        .returning(|_, _, _| Ok(()));

    let coordinator = coordinator(calendar, intakes, MockNotifier::new());
    let result = coordinator.commit_booking(&request()).await;

    assert_matches!(result, Err(BookingError::SlotTaken));
}

#[tokio::test]
async fn free_busy_failure_fails_the_commit_closed() {
    let mut calendar = MockCalendarApi::new();
    calendar
        .expect_get_free_busy()
        .returning(|_, _, _| Err(CalendarError::Timeout));

    let mut intakes = MockIntakeStore::new();
    intakes.expect_create_intake().returning(|_| Ok(()));
    intakes
        .expect_set_status()
        .withf(|_, status, _| *status == IntakeStatus::Failed)
        .times(1)
        .returning(|_, _, _| Ok(()));

    let coordinator = coordinator(calendar, intakes, MockNotifier::new());
    let result = coordinator.commit_booking(&request()).await;

    assert_matches!(result, Err(BookingError::Calendar(_)));
}

#[tokio::test]
async fn unknown_doctor_fails_before_any_intake_write() {
    let calendar = MockCalendarApi::new();
    let intakes = MockIntakeStore::new();

    let coordinator = coordinator(calendar, intakes, MockNotifier::new());
    let mut bad_request = request();
    bad_request.doctor_id = "dr-nobody".to_string();

    let result = coordinator.commit_booking(&bad_request).await;
    assert_matches!(result, Err(BookingError::ScheduleNotFound));
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_booking() {
    let mut calendar = MockCalendarApi::new();
    calendar.expect_get_free_busy().returning(|_, _, _| Ok(vec![]));
    calendar
        .expect_create_event()
        .returning(|_, event| Ok(created_event("evt-2", event.start, event.end)));

    let mut intakes = MockIntakeStore::new();
    intakes.expect_create_intake().returning(|_| Ok(()));
    no_follow_ups(&mut intakes);
    intakes
        .expect_set_status()
        .withf(|_, status, _| *status == IntakeStatus::Confirmed)
        .times(1)
        .returning(|_, _, _| Ok(()));

    let mut notifier = MockNotifier::new();
    notifier
        .expect_send_confirmation()
        .returning(|_| Err(anyhow::anyhow!("webhook down")));

    let coordinator = coordinator(calendar, intakes, notifier);
    let confirmation = coordinator.commit_booking(&request()).await.unwrap();

    assert_eq!(confirmation.event_id, "evt-2");
}

#[tokio::test]
async fn nearby_pending_follow_up_is_adopted() {
    let plan_id = Uuid::new_v4();

    let mut calendar = MockCalendarApi::new();
    calendar.expect_get_free_busy().returning(|_, _, _| Ok(vec![]));
    calendar
        .expect_create_event()
        .returning(|_, event| Ok(created_event("evt-3", event.start, event.end)));

    let mut intakes = MockIntakeStore::new();
    intakes.expect_create_intake().returning(|_| Ok(()));
    intakes
        .expect_pending_follow_ups_near()
        .withf(|email, around, window| {
            email == "ada@example.com" && *around == monday() && *window == 3
        })
        .returning(move |_, _, _| {
            Ok(vec![FollowUpPlan {
                id: plan_id,
                patient_email: "ada@example.com".to_string(),
                suggested_date: monday(),
                status: FollowUpStatus::Pending,
                event_id: None,
            }])
        });
    intakes
        .expect_mark_follow_up_booked()
        .withf(move |id, event_id| *id == plan_id && event_id == "evt-3")
        .times(1)
        .returning(|_, _| Ok(()));
    intakes.expect_set_status().returning(|_, _, _| Ok(()));

    let coordinator = coordinator(calendar, intakes, quiet_notifier());
    coordinator.commit_booking(&request()).await.unwrap();
}

#[tokio::test]
async fn second_commit_for_the_same_slot_loses_the_race() {
    let mut seq = Sequence::new();
    let mut calendar = MockCalendarApi::new();
    calendar
        .expect_get_free_busy()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(vec![]));
    calendar
        .expect_create_event()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, event| Ok(created_event("evt-4", event.start, event.end)));
    calendar
        .expect_get_free_busy()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, start, end| Ok(vec![BusyInterval { start, end }]));

    let mut intakes = MockIntakeStore::new();
    intakes.expect_create_intake().returning(|_| Ok(()));
    no_follow_ups(&mut intakes);
    intakes.expect_set_status().returning(|_, _, _| Ok(()));

    let coordinator = coordinator(calendar, intakes, quiet_notifier());

    let first = coordinator.commit_booking(&request()).await;
    assert!(first.is_ok());

    let second = coordinator.commit_booking(&request()).await;
    assert_matches!(second, Err(BookingError::SlotTaken));
}

#[tokio::test]
async fn reschedule_ignores_busy_time_from_the_moved_event_itself() {
    let old_start = booked_start_utc();
    let old_end = old_start + chrono::Duration::minutes(30);
    // Move 30 minutes later; the new window still overlaps the old one.
    let new_start = old_start + chrono::Duration::minutes(15);
    let new_end = new_start + chrono::Duration::minutes(30);

    let mut calendar = MockCalendarApi::new();
    calendar
        .expect_get_event()
        .returning(move |_, _| Ok(created_event("evt-5", old_start, old_end)));
    calendar.expect_get_free_busy().returning(move |_, _, _| {
        Ok(vec![BusyInterval { start: old_start, end: old_end }])
    });
    calendar
        .expect_update_event()
        .withf(move |_, event_id, window| {
            event_id == "evt-5" && window.start == new_start && window.end == new_end
        })
        .times(1)
        .returning(move |_, _, _| Ok(created_event("evt-5", new_start, new_end)));

    let intake = existing_intake("evt-5");
    let intake_id = intake.id;
    let mut intakes = MockIntakeStore::new();
    intakes
        .expect_find_by_event()
        .returning(move |_| Ok(Some(intake.clone())));
    intakes
        .expect_update_window()
        .withf(move |id, start, end| *id == intake_id && *start == new_start && *end == new_end)
        .times(1)
        .returning(|_, _, _| Ok(()));

    let coordinator = coordinator(calendar, intakes, MockNotifier::new());
    let confirmation = coordinator
        .reschedule_booking(
            "evt-5",
            &RescheduleRequest {
                calendar_id: "cal-adams-main".to_string(),
                new_date: monday(),
                new_time: hm(10, 15),
                duration_minutes: 30,
            },
        )
        .await
        .unwrap();

    assert_eq!(confirmation.starts_at, new_start);
    assert_eq!(confirmation.intake_id, Some(intake_id));
}

#[tokio::test]
async fn reschedule_into_another_booking_is_a_conflict() {
    let old_start = booked_start_utc();
    let old_end = old_start + chrono::Duration::minutes(30);
    let foreign_start = old_end + chrono::Duration::minutes(30);

    let mut calendar = MockCalendarApi::new();
    calendar
        .expect_get_event()
        .returning(move |_, _| Ok(created_event("evt-6", old_start, old_end)));
    calendar.expect_get_free_busy().returning(move |_, _, _| {
        Ok(vec![BusyInterval {
            start: foreign_start,
            end: foreign_start + chrono::Duration::minutes(30),
        }])
    });
    // No update_event expectation.

    let coordinator = coordinator(calendar, MockIntakeStore::new(), MockNotifier::new());
    let result = coordinator
        .reschedule_booking(
            "evt-6",
            &RescheduleRequest {
                calendar_id: "cal-adams-main".to_string(),
                new_date: monday(),
                new_time: hm(11, 0),
                duration_minutes: 30,
            },
        )
        .await;

    assert_matches!(result, Err(BookingError::SlotTaken));
}

#[tokio::test]
async fn reschedule_of_an_unknown_event_is_not_found() {
    let mut calendar = MockCalendarApi::new();
    calendar
        .expect_get_event()
        .returning(|_, event_id| Err(CalendarError::EventNotFound(event_id.to_string())));

    let coordinator = coordinator(calendar, MockIntakeStore::new(), MockNotifier::new());
    let result = coordinator
        .reschedule_booking(
            "evt-missing",
            &RescheduleRequest {
                calendar_id: "cal-adams-main".to_string(),
                new_date: monday(),
                new_time: hm(10, 0),
                duration_minutes: 30,
            },
        )
        .await;

    assert_matches!(result, Err(BookingError::NotFound(id)) if id == "evt-missing");
}

#[tokio::test]
async fn cancel_deletes_the_event_and_cancels_the_intake() {
    let mut calendar = MockCalendarApi::new();
    calendar
        .expect_delete_event()
        .withf(|calendar_id, event_id| calendar_id == "cal-adams-main" && event_id == "evt-7")
        .times(1)
        .returning(|_, _| Ok(()));

    let intake = existing_intake("evt-7");
    let intake_id = intake.id;
    let mut intakes = MockIntakeStore::new();
    intakes
        .expect_find_by_event()
        .returning(move |_| Ok(Some(intake.clone())));
    intakes
        .expect_set_status()
        .withf(move |id, status, _| *id == intake_id && *status == IntakeStatus::Cancelled)
        .times(1)
        .returning(|_, _, _| Ok(()));

    let coordinator = coordinator(calendar, intakes, MockNotifier::new());
    let result = coordinator
        .cancel_booking("evt-7", &CancelRequest { calendar_id: "cal-adams-main".to_string() })
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn cancel_of_an_already_deleted_event_still_succeeds() {
    let mut calendar = MockCalendarApi::new();
    calendar
        .expect_delete_event()
        .returning(|_, event_id| Err(CalendarError::EventNotFound(event_id.to_string())));

    let mut intakes = MockIntakeStore::new();
    intakes.expect_find_by_event().returning(|_| Ok(None));

    let coordinator = coordinator(calendar, intakes, MockNotifier::new());
    let result = coordinator
        .cancel_booking("evt-gone", &CancelRequest { calendar_id: "cal-adams-main".to_string() })
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn invalid_local_time_is_rejected() {
    // 2026-03-29 02:30 does not exist in Europe/Madrid; the clocks jump
    // from 02:00 to 03:00.
    let tz: Tz = "Europe/Madrid".parse().unwrap();
    let coordinator = BookingCoordinator::new(
        repository(),
        Arc::new(MockCalendarApi::new()),
        Arc::new(MockIntakeStore::new()),
        Arc::new(MockNotifier::new()),
        tz,
    );

    let mut bad_request = request();
    bad_request.date = NaiveDate::from_ymd_opt(2026, 3, 29).unwrap();
    bad_request.time = hm(2, 30);

    let result = coordinator.commit_booking(&bad_request).await;
    assert_matches!(result, Err(BookingError::InvalidInput(_)));
}
