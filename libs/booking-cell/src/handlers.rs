// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use shared_models::error::AppError;

use crate::models::{
    BookingConfirmation, BookingError, BookingIntake, BookingRequest, CancelRequest,
    RescheduleRequest,
};
use crate::services::commit::BookingCoordinator;
use crate::services::intake::IntakeStore;

pub struct BookingState {
    pub coordinator: BookingCoordinator,
    pub intakes: Arc<dyn IntakeStore>,
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<BookingState>>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingConfirmation>), AppError> {
    let confirmation = state
        .coordinator
        .commit_booking(&request)
        .await
        .map_err(map_booking_error)?;

    Ok((StatusCode::CREATED, Json(confirmation)))
}

#[axum::debug_handler]
pub async fn reschedule_booking(
    State(state): State<Arc<BookingState>>,
    Path(event_id): Path<String>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<BookingConfirmation>, AppError> {
    let confirmation = state
        .coordinator
        .reschedule_booking(&event_id, &request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(confirmation))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<BookingState>>,
    Path(event_id): Path<String>,
    Json(request): Json<CancelRequest>,
) -> Result<StatusCode, AppError> {
    state
        .coordinator
        .cancel_booking(&event_id, &request)
        .await
        .map_err(map_booking_error)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BookingSearchParams {
    pub patient_email: String,
}

#[axum::debug_handler]
pub async fn search_bookings(
    State(state): State<Arc<BookingState>>,
    Query(params): Query<BookingSearchParams>,
) -> Result<Json<Vec<BookingIntake>>, AppError> {
    let intakes = state
        .intakes
        .list_by_patient_email(&params.patient_email)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(intakes))
}

pub(crate) fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::InvalidInput(msg) => AppError::BadRequest(msg),
        BookingError::ScheduleNotFound => {
            AppError::NotFound("No bookable schedule for this doctor and clinic".to_string())
        }
        BookingError::SlotTaken => {
            AppError::Conflict("The requested slot is no longer available".to_string())
        }
        BookingError::NotFound(event_id) => {
            AppError::NotFound(format!("No booking found for event {}", event_id))
        }
        BookingError::Calendar(msg) => AppError::ExternalService(msg),
        BookingError::Datastore(msg) => AppError::Database(msg),
    }
}
