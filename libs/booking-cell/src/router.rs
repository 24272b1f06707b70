// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{patch, post},
    Router,
};

use crate::handlers::{self, BookingState};

pub fn booking_routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/", post(handlers::create_booking).get(handlers::search_bookings))
        .route("/{event_id}/reschedule", patch(handlers::reschedule_booking))
        .route("/{event_id}/cancel", post(handlers::cancel_booking))
        .with_state(state)
}
