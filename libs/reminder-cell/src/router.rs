// libs/reminder-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers::{self, ReminderState};

pub fn reminder_routes(state: Arc<ReminderState>) -> Router {
    Router::new()
        .route("/sweep", post(handlers::run_sweep))
        .with_state(state)
}
