// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use shared_models::error::AppError;

use crate::models::{AvailabilityError, SlotListing};
use crate::services::slots::SlotGenerator;

pub struct AvailabilityState {
    pub slots: SlotGenerator,
}

#[derive(Debug, Deserialize)]
pub struct SlotQueryParams {
    pub doctor_id: String,
    pub clinic_id: String,
    /// Clinic-local civil date, `YYYY-MM-DD`.
    pub date: String,
    pub duration_minutes: i64,
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<AvailabilityState>>,
    Query(params): Query<SlotQueryParams>,
) -> Result<Json<SlotListing>, AppError> {
    let date = NaiveDate::parse_from_str(&params.date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date: {}", params.date)))?;

    let listing = state
        .slots
        .generate_slots(
            date,
            &params.doctor_id,
            &params.clinic_id,
            params.duration_minutes,
            Utc::now(),
        )
        .await
        .map_err(map_availability_error)?;

    Ok(Json(listing))
}

pub(crate) fn map_availability_error(e: AvailabilityError) -> AppError {
    match e {
        AvailabilityError::NotBookable => {
            AppError::NotFound("No bookable schedule for this doctor and clinic".to_string())
        }
        AvailabilityError::InvalidInput(msg) => AppError::BadRequest(msg),
        AvailabilityError::Calendar(e) => AppError::ExternalService(e.to_string()),
        AvailabilityError::Datastore(msg) => AppError::Database(msg),
    }
}
