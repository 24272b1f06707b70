// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers::{self, AvailabilityState};

pub fn availability_routes(state: Arc<AvailabilityState>) -> Router {
    Router::new()
        .route("/slots", get(handlers::list_slots))
        .with_state(state)
}
