// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::time::hhmm;

/// A confirmed booking may adopt a pending follow-up plan whose suggested
/// date lies within this many days of the booked date.
pub const FOLLOW_UP_WINDOW_DAYS: i64 = 3;

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientContact {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: String,
    pub clinic_id: String,
    /// Clinic-local civil date.
    pub date: NaiveDate,
    /// Clinic-local wall-clock start, `HH:MM`.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub duration_minutes: i64,
    pub patient: PatientContact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub calendar_id: String,
    pub new_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub new_time: NaiveTime,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub calendar_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub event_id: String,
    /// Absent when the shadow row could not be located (e.g. a reschedule
    /// of an event booked before intake tracking existed).
    pub intake_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

// ==============================================================================
// SHADOW RECORD
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStatus {
    Pending,
    Confirmed,
    Cancelled,
    Failed,
}

impl fmt::Display for IntakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeStatus::Pending => write!(f, "pending"),
            IntakeStatus::Confirmed => write!(f, "confirmed"),
            IntakeStatus::Cancelled => write!(f, "cancelled"),
            IntakeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Local record of a booking attempt. The external calendar event, not this
/// row, is the source of truth for the reservation; the row exists for
/// audit, patient correlation and reminder bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingIntake {
    pub id: Uuid,
    pub doctor_id: String,
    pub clinic_id: String,
    pub calendar_id: String,
    pub patient_name: String,
    pub patient_email: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: IntakeStatus,
    pub event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingIntake {
    pub fn new_pending(
        request: &BookingRequest,
        calendar_id: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id.clone(),
            clinic_id: request.clinic_id.clone(),
            calendar_id: calendar_id.to_string(),
            patient_name: request.patient.name.clone(),
            patient_email: request.patient.email.clone(),
            starts_at,
            ends_at,
            status: IntakeStatus::Pending,
            event_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ==============================================================================
// FOLLOW-UP PLANS (external collaborator entity)
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    Pending,
    Booked,
    Done,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpPlan {
    pub id: Uuid,
    pub patient_email: String,
    pub suggested_date: NaiveDate,
    pub status: FollowUpStatus,
    pub event_id: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no active schedule mapping for this doctor and clinic")]
    ScheduleNotFound,

    #[error("requested slot is no longer available")]
    SlotTaken,

    #[error("no booking found for event {0}")]
    NotFound(String),

    #[error("calendar provider error: {0}")]
    Calendar(String),

    #[error("datastore error: {0}")]
    Datastore(String),
}
