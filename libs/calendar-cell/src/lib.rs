pub mod models;
pub mod services;

pub use models::*;
pub use services::gateway::{CalendarApi, MockCalendarApi};
pub use services::http::HttpCalendarClient;
