pub mod holiday;
pub mod schedule;
pub mod slots;
