pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::holiday::{HolidayResolver, HolidayStore, MockHolidayStore, PostgrestHolidayStore};
pub use services::schedule::{
    Clock, MockClock, MockScheduleStore, PostgrestScheduleStore, ScheduleRepository,
    ScheduleStore, SystemClock,
};
pub use services::slots::SlotGenerator;
