use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use availability_cell::handlers::AvailabilityState;
use availability_cell::router::availability_routes;
use booking_cell::handlers::BookingState;
use booking_cell::router::booking_routes;
use reminder_cell::handlers::ReminderState;
use reminder_cell::router::reminder_routes;

pub fn create_router(
    availability: Arc<AvailabilityState>,
    booking: Arc<BookingState>,
    reminder: Arc<ReminderState>,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/availability", availability_routes(availability))
        .nest("/bookings", booking_routes(booking))
        .nest("/reminders", reminder_routes(reminder))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
