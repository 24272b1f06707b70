// libs/reminder-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use shared_models::error::AppError;

use crate::models::{SweepParams, SweepReport};
use crate::services::sweeper::ReminderSweeper;

pub struct ReminderState {
    pub sweeper: ReminderSweeper,
}

/// Triggered by an external scheduler. The body may be empty `{}`; every
/// parameter has a default. Failures inside the sweep are counted in the
/// report, not surfaced as an HTTP error.
#[axum::debug_handler]
pub async fn run_sweep(
    State(state): State<Arc<ReminderState>>,
    Json(params): Json<SweepParams>,
) -> Result<Json<SweepReport>, AppError> {
    if params.tolerance_hours < 0 || params.window_hours_ahead < 0 {
        return Err(AppError::BadRequest(
            "window_hours_ahead and tolerance_hours must be non-negative".to_string(),
        ));
    }

    let report = state.sweeper.sweep(&params, Utc::now()).await;
    Ok(Json(report))
}
