pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::commit::BookingCoordinator;
pub use services::intake::{IntakeStore, MockIntakeStore, PostgrestIntakeStore};
pub use services::notify::{MockNotifier, Notifier, WebhookNotifier};
